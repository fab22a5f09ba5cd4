//! Dataset loading for the fine-tuning drivers.

use crate::adapters::severity::read_condition_rows;
use crate::adapters::vision::labels_from_image_folder;
use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One supervised example: model input plus class index.
#[derive(Debug, Clone)]
pub struct Example<I> {
    pub input: I,
    pub label: u32,
}

/// An image-folder dataset: `<root>/<class>/<image>`.
#[derive(Debug)]
pub struct ImageFolder {
    /// Class names, sorted. Index = label.
    pub classes: Vec<String>,
    pub samples: Vec<Example<PathBuf>>,
}

/// Enumerate an image-folder dataset. Class order matches the serving label loader.
pub fn load_image_folder(root: &Path) -> anyhow::Result<ImageFolder> {
    let classes = labels_from_image_folder(root)?;
    let mut samples = Vec::new();
    for (label, class) in classes.iter().enumerate() {
        let dir = root.join(class);
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
            .with_context(|| format!("read class dir {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .map(|entry| entry.path())
            .collect();
        files.sort();
        samples.extend(files.into_iter().map(|path| Example {
            input: path,
            label: label as u32,
        }));
    }
    Ok(ImageFolder { classes, samples })
}

/// `(text, label)` rows from the severity CSV.
///
/// Conditions are lowercased; severities capitalized (`"HIGH"` -> `"High"`).
pub fn load_severity_rows(path: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let file = std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rows = read_condition_rows(file)?
        .into_iter()
        .map(|(condition, severity)| (condition.to_lowercase(), capitalize(&severity)))
        .collect();
    Ok(rows)
}

/// First character uppercased, the rest lowercased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Maps label strings to indices in sorted order.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let classes: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn transform(&self, label: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
            .map(|i| i as u32)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Shuffle with a fixed seed and split off `test_ratio` (rounded up) as the test set.
pub fn train_test_split<T>(mut items: Vec<T>, test_ratio: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    let n_test = ((items.len() as f64) * test_ratio.clamp(0.0, 1.0)).ceil() as usize;
    let test = items.split_off(items.len() - n_test.min(items.len()));
    (items, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("HIGH"), "High");
        assert_eq!(capitalize("medium"), "Medium");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_label_encoder_sorted() {
        let enc = LabelEncoder::fit(["Medium", "High", "Low", "High"]);
        assert_eq!(enc.classes(), ["High", "Low", "Medium"]);
        assert_eq!(enc.transform("Low"), Some(1));
        assert_eq!(enc.transform("Critical"), None);
    }

    #[test]
    fn test_split_is_seeded_and_complete() {
        let items: Vec<u32> = (0..10).collect();
        let (train, test) = train_test_split(items.clone(), 0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        let (train2, test2) = train_test_split(items, 0.2, 42);
        assert_eq!(train, train2);
        assert_eq!(test, test2);

        let mut all: Vec<u32> = train.into_iter().chain(test).collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let (train, test) = train_test_split(vec![1, 2, 3], 0.2, 7);
        assert_eq!((train.len(), test.len()), (2, 1));
    }

    #[test]
    fn test_image_folder_labels_follow_sorted_classes() {
        let dir = tempfile::tempdir().unwrap();
        for (class, files) in [("ringworm", &["b.jpg", "a.jpg"][..]), ("acne", &["x.png"][..])] {
            std::fs::create_dir(dir.path().join(class)).unwrap();
            for f in files {
                std::fs::write(dir.path().join(class).join(f), b"img").unwrap();
            }
        }
        std::fs::write(dir.path().join("acne").join(".DS_Store"), b"").unwrap();

        let folder = load_image_folder(dir.path()).unwrap();
        assert_eq!(folder.classes, ["acne", "ringworm"]);
        let labels: Vec<u32> = folder.samples.iter().map(|s| s.label).collect();
        assert_eq!(labels, [0, 1, 1]);
        assert!(folder.samples[1].input.ends_with("ringworm/a.jpg"));
    }

    #[test]
    fn test_severity_rows_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("severity.csv");
        std::fs::write(&path, "Condition,Severity\nAcne,LOW\nShingles,high\n,Medium\n").unwrap();
        let rows = load_severity_rows(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                ("acne".to_string(), "Low".to_string()),
                ("shingles".to_string(), "High".to_string())
            ]
        );
    }
}
