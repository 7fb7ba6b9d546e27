use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fenjian::{
  label::LabelSet,
  model::{Detector, RawDetection},
};
use image::{Rgb, RgbImage};

/// Background colour of generated test images
pub const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);
/// Colour the annotator uses for boxes
pub const BOX_GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// Detector stub that answers by image size, so each test image gets its own
/// scripted output. Records the size of every image it was called with.
#[derive(Default)]
pub struct ScriptedDetector {
  outputs: HashMap<(u32, u32), Vec<RawDetection>>,
  failing: Option<(u32, u32)>,
  width: Option<usize>,
  pub calls: RefCell<Vec<(u32, u32)>>,
}

impl ScriptedDetector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(mut self, size: (u32, u32), raws: Vec<RawDetection>) -> Self {
    self.outputs.insert(size, raws);
    self
  }

  pub fn fail_on(mut self, size: (u32, u32)) -> Self {
    self.failing = Some(size);
    self
  }

  pub fn with_output_width(mut self, width: usize) -> Self {
    self.width = Some(width);
    self
  }
}

impl Detector for ScriptedDetector {
  type Error = std::io::Error;

  fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, Self::Error> {
    let size = image.dimensions();
    self.calls.borrow_mut().push(size);
    if self.failing == Some(size) {
      return Err(std::io::Error::other("scripted failure"));
    }
    Ok(self.outputs.get(&size).cloned().unwrap_or_default())
  }

  fn output_width(&self) -> Option<usize> {
    self.width
  }
}

/// Labels used by most tests: id 0 = cat, id 1 = dog
pub fn pet_labels() -> LabelSet {
  ["cat", "dog"].into_iter().collect()
}

/// Builds a raw detection for a pixel-space box `(x, y, w, h)` on an image of
/// `image` size, with `score` for `class_id` and zero for every other class.
pub fn raw_box(
  image: (u32, u32),
  bbox: (f32, f32, f32, f32),
  class_id: usize,
  score: f32,
  num_classes: usize,
) -> RawDetection {
  let (iw, ih) = (image.0 as f32, image.1 as f32);
  let (x, y, w, h) = bbox;
  let mut values = vec![(x + w / 2.0) / iw, (y + h / 2.0) / ih, w / iw, h / ih];
  let mut scores = vec![0.0; num_classes];
  scores[class_id] = score;
  values.extend(scores);
  RawDetection::from(values)
}

/// Writes a solid grey PNG of the given size.
pub fn write_image(dir: &Path, name: &str, size: (u32, u32)) -> PathBuf {
  let path = dir.join(name);
  RgbImage::from_pixel(size.0, size.1, BACKGROUND)
    .save_with_format(&path, image::ImageFormat::Png)
    .expect("Failed to save test image");
  path
}

/// Creates `input/` and `output/` paths under a fresh temp directory. Only the
/// input directory is created on disk.
pub fn workspace() -> (tempfile::TempDir, PathBuf, PathBuf) {
  let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
  let input = dir.path().join("input");
  let output = dir.path().join("output");
  std::fs::create_dir(&input).expect("Failed to create input directory");
  (dir, input, output)
}

/// Names of the entries directly under `dir`, sorted
pub fn entries(dir: &Path) -> Vec<String> {
  let mut names: Vec<String> = std::fs::read_dir(dir)
    .map(|rd| {
      rd.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
    })
    .unwrap_or_default();
  names.sort();
  names
}
