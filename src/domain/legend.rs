use image::Rgb;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub class_name: String,
    pub color: Rgb<u8>,
}

/// Insertion-ordered class → color map for one rendering run.
///
/// The first detection of a class fixes its color; later detections of the
/// same class never replace it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Legend {
    entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the class was new.
    pub fn insert_if_absent(&mut self, class_name: &str, color: Rgb<u8>) -> bool {
        if self.color_of(class_name).is_some() {
            return false;
        }
        self.entries.push(LegendEntry { class_name: class_name.to_string(), color });
        true
    }

    pub fn color_of(&self, class_name: &str) -> Option<Rgb<u8>> {
        self.entries.iter().find(|e| e.class_name == class_name).map(|e| e.color)
    }

    pub fn entries(&self) -> &[LegendEntry] {
        &self.entries
    }
}
