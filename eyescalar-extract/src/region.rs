//! Interest-area classification
//!
//! Maps opaque interest-area tags onto the closed set of screen regions.
//! Rule order: right marker, left marker, image marker, else background.
//! If markers overlap, the right marker wins.

use eyescalar_common::config::MarkerConfig;
use serde::Serialize;

/// Screen region a fixation is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Left,
    Right,
    Image,
    Background,
}

impl Region {
    /// Side of a disc region, `None` for image and background
    pub fn side(self) -> Option<Side> {
        match self {
            Region::Left => Some(Side::Left),
            Region::Right => Some(Side::Right),
            Region::Image | Region::Background => None,
        }
    }
}

/// Left or right disc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn code(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

/// One value per region
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionMap<T> {
    pub left: T,
    pub right: T,
    pub image: T,
    pub background: T,
}

impl<T> RegionMap<T> {
    pub fn get(&self, region: Region) -> &T {
        match region {
            Region::Left => &self.left,
            Region::Right => &self.right,
            Region::Image => &self.image,
            Region::Background => &self.background,
        }
    }

    pub fn get_mut(&mut self, region: Region) -> &mut T {
        match region {
            Region::Left => &mut self.left,
            Region::Right => &mut self.right,
            Region::Image => &mut self.image,
            Region::Background => &mut self.background,
        }
    }

    /// Value of a disc side
    pub fn side(&self, side: Side) -> &T {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Tag classifier built from the configured markers
#[derive(Debug, Clone)]
pub struct RegionClassifier {
    right: String,
    left: String,
    image: String,
}

impl RegionClassifier {
    pub fn new(markers: &MarkerConfig) -> Self {
        Self {
            right: markers.right.clone(),
            left: markers.left.clone(),
            image: markers.image.clone(),
        }
    }

    /// Classify an interest-area tag
    pub fn classify(&self, tag: &str) -> Region {
        if tag.contains(self.right.as_str()) {
            Region::Right
        } else if tag.contains(self.left.as_str()) {
            Region::Left
        } else if tag.contains(self.image.as_str()) {
            Region::Image
        } else {
            Region::Background
        }
    }
}

impl Default for RegionClassifier {
    fn default() -> Self {
        Self::new(&MarkerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_markers() {
        let classifier = RegionClassifier::default();
        assert_eq!(classifier.classify("R"), Region::Right);
        assert_eq!(classifier.classify("L "), Region::Left);
        assert_eq!(classifier.classify("image"), Region::Image);
        assert_eq!(classifier.classify("."), Region::Background);
        assert_eq!(classifier.classify(""), Region::Background);
    }

    #[test]
    fn test_right_marker_has_precedence() {
        let classifier = RegionClassifier::default();
        // Contains both "R" and "L"
        assert_eq!(classifier.classify("LR"), Region::Right);
        // Contains "L" and "image"
        assert_eq!(classifier.classify("L_image"), Region::Left);
    }

    #[test]
    fn test_custom_markers() {
        let markers = MarkerConfig {
            right: "disc_right".to_string(),
            left: "disc_left".to_string(),
            image: "IMG".to_string(),
        };
        let classifier = RegionClassifier::new(&markers);
        assert_eq!(classifier.classify("disc_right"), Region::Right);
        assert_eq!(classifier.classify("disc_left"), Region::Left);
        assert_eq!(classifier.classify("IMG_3"), Region::Image);
        assert_eq!(classifier.classify("R"), Region::Background);
    }

    #[test]
    fn test_region_map_access() {
        let mut map: RegionMap<u32> = RegionMap::default();
        *map.get_mut(Region::Image) += 2;
        *map.get_mut(Region::Left) += 1;
        assert_eq!(*map.get(Region::Image), 2);
        assert_eq!(*map.side(Side::Left), 1);
        assert_eq!(*map.side(Side::Right), 0);
    }
}
