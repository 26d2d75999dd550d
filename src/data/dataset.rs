use crate::backend::Element;
use crate::classes::NUM_CLASSES;
use burn_dataset::network::downloader::download_file_as_bytes;
use burn_dataset::{
    Dataset, InMemDataset,
    transform::{Mapper, MapperDataset},
};
use flate2::read::GzDecoder;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Zalando Research mirror of the Fashion-MNIST files
const URL: &str = "http://fashion-mnist.s3-website.eu-central-1.amazonaws.com/";
const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected magic number {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("Expected {}x{} images, found {rows}x{cols}", HEIGHT, WIDTH)]
    BadDimensions { rows: usize, cols: usize },

    #[error("Truncated file: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("Found {images} images but {labels} labels")]
    CountMismatch { images: usize, labels: usize },

    #[error("Image {index} has {len} pixels, expected {}", HEIGHT * WIDTH)]
    BadImageSize { index: usize, len: usize },

    #[error("Label {label} of item {index} is outside of the {} known classes", NUM_CLASSES)]
    LabelOutOfRange { index: usize, label: u8 },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> DatasetError + '_ {
    move |source| DatasetError::Io {
        path: path.to_owned(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    fn images_file(self) -> &'static str {
        match self {
            Split::Train => TRAIN_IMAGES,
            Split::Test => TEST_IMAGES,
        }
    }

    fn labels_file(self) -> &'static str {
        match self {
            Split::Train => TRAIN_LABELS,
            Split::Test => TEST_LABELS,
        }
    }
}

/// Fashion-MNIST item.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FashionMnistItem {
    /// Image as a flat, row-major array of floats.
    /// Each value is a brightness, in between 0.0 and 255.0.
    ///
    /// # Shape
    /// [HEIGHT * WIDTH]
    pub image: Vec<Element>,

    /// Label of the image.
    /// Each value is in between 0 and 9, see [`crate::classes::CLASS_NAMES`].
    pub label: u8,
}

#[derive(Deserialize, Debug, Clone)]
struct FashionMnistItemRaw {
    pub image_bytes: Vec<u8>,
    pub label: u8,
}

struct BytesToImage;

impl Mapper<FashionMnistItemRaw, FashionMnistItem> for BytesToImage {
    /// Convert a raw item (image bytes) to an item (flat array image).
    fn map(&self, item: &FashionMnistItemRaw) -> FashionMnistItem {
        debug_assert_eq!(item.image_bytes.len(), WIDTH * HEIGHT);

        let image: Vec<Element> = item
            .image_bytes
            .iter()
            .map(|brightness| {
                let element: Element = (*brightness).as_();
                element
            })
            .collect();

        FashionMnistItem {
            image,
            label: item.label,
        }
    }
}

/// Fashion-MNIST: 70,000 28x28 grayscale images of clothing in 10 classes,
/// 60,000 for training and 10,000 for testing.
///
/// Files are downloaded on first use and cached (decompressed) under
/// `<cache_dir>/fashion-mnist/<split>/`. Present files are never downloaded again.
pub struct FashionMnistDataset {
    dataset: Box<dyn Dataset<FashionMnistItem>>,
}

impl Dataset<FashionMnistItem> for FashionMnistDataset {
    fn get(&self, index: usize) -> Option<FashionMnistItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl FashionMnistDataset {
    /// Creates the train dataset.
    pub fn train<P: AsRef<Path>>(cache_dir: P) -> Result<Self, DatasetError> {
        Self::new(cache_dir, Split::Train)
    }

    /// Creates the test dataset.
    pub fn test<P: AsRef<Path>>(cache_dir: P) -> Result<Self, DatasetError> {
        Self::new(cache_dir, Split::Test)
    }

    pub fn new<P: AsRef<Path>>(cache_dir: P, split: Split) -> Result<Self, DatasetError> {
        let root = Self::download(cache_dir.as_ref(), split)?;

        // small enough to be kept in-memory
        // train images (u8): 28 * 28 * 60000 = 47.04Mb
        let images_path = root.join(split.images_file());
        let labels_path = root.join(split.labels_file());
        let images = parse_images(&std::fs::read(&images_path).map_err(io_err(&images_path))?)?;
        let labels = parse_labels(&std::fs::read(&labels_path).map_err(io_err(&labels_path))?)?;

        let dataset = Self::from_raw(images, labels)?;
        log::info!(
            "Loaded {} {} items from {root:?}",
            dataset.len(),
            split.dir_name()
        );
        Ok(dataset)
    }

    /// Builds an in-memory dataset from raw grayscale images (`HEIGHT * WIDTH` bytes each)
    /// and their labels.
    pub fn from_raw(images: Vec<Vec<u8>>, labels: Vec<u8>) -> Result<Self, DatasetError> {
        if images.len() != labels.len() {
            return Err(DatasetError::CountMismatch {
                images: images.len(),
                labels: labels.len(),
            });
        }
        if let Some((index, image)) = images
            .iter()
            .enumerate()
            .find(|(_, image)| image.len() != WIDTH * HEIGHT)
        {
            return Err(DatasetError::BadImageSize {
                index,
                len: image.len(),
            });
        }
        if let Some((index, &label)) = labels
            .iter()
            .enumerate()
            .find(|(_, label)| **label as usize >= NUM_CLASSES)
        {
            return Err(DatasetError::LabelOutOfRange { index, label });
        }

        let items: Vec<_> = images
            .into_iter()
            .zip(labels)
            .map(|(image_bytes, label)| FashionMnistItemRaw { image_bytes, label })
            .collect();

        let dataset = InMemDataset::new(items);
        let dataset = MapperDataset::new(dataset, BytesToImage);

        Ok(Self {
            dataset: Box::new(dataset),
        })
    }

    /// Builds an in-memory dataset from already decoded items.
    ///
    /// Every image must have `HEIGHT * WIDTH` values and every label must be a known class.
    pub fn from_items(items: Vec<FashionMnistItem>) -> Result<Self, DatasetError> {
        for (index, item) in items.iter().enumerate() {
            if item.image.len() != WIDTH * HEIGHT {
                return Err(DatasetError::BadImageSize {
                    index,
                    len: item.image.len(),
                });
            }
            if item.label as usize >= NUM_CLASSES {
                return Err(DatasetError::LabelOutOfRange {
                    index,
                    label: item.label,
                });
            }
        }

        Ok(Self {
            dataset: Box::new(InMemDataset::new(items)),
        })
    }

    /// Makes sure both files of the split are present in the cache directory.
    fn download(cache_dir: &Path, split: Split) -> Result<PathBuf, DatasetError> {
        let split_dir = cache_dir.join("fashion-mnist").join(split.dir_name());
        create_dir_all(&split_dir).map_err(io_err(&split_dir))?;

        Self::download_file(split.images_file(), &split_dir)?;
        Self::download_file(split.labels_file(), &split_dir)?;

        Ok(split_dir)
    }

    /// Download a gzipped file and write it, decompressed, into the destination directory.
    /// Progress is reported by the burn-dataset downloader.
    fn download_file(name: &str, dest_dir: &Path) -> Result<PathBuf, DatasetError> {
        let file_name = dest_dir.join(name);
        if file_name.exists() {
            log::debug!("{file_name:?} already exists, skipping download");
            return Ok(file_name);
        }

        log::info!("Downloading {URL}{name}.gz");
        let bytes = download_file_as_bytes(&format!("{URL}{name}.gz"), name);

        // written under a temporary name first so that an interrupted run isn't mistaken for a cached file
        let partial = file_name.with_extension("part");
        let mut output_file = File::create(&partial).map_err(io_err(&partial))?;
        let mut gz_buffer = GzDecoder::new(&bytes[..]);
        std::io::copy(&mut gz_buffer, &mut output_file).map_err(io_err(&partial))?;
        std::fs::rename(&partial, &file_name).map_err(io_err(&file_name))?;

        Ok(file_name)
    }
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32, DatasetError> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(DatasetError::Truncated {
            expected: offset + 4,
            found: bytes.len(),
        })
}

fn check_magic(bytes: &[u8], expected: u32) -> Result<(), DatasetError> {
    let found = read_u32_be(bytes, 0)?;
    if found != expected {
        return Err(DatasetError::BadMagic { expected, found });
    }
    Ok(())
}

/// Parses an IDX3 images file.
///
/// Layout (big-endian): magic `0x00000803`, count, rows, cols, then `count * rows * cols` bytes.
pub fn parse_images(bytes: &[u8]) -> Result<Vec<Vec<u8>>, DatasetError> {
    check_magic(bytes, IMAGES_MAGIC)?;
    let count = read_u32_be(bytes, 4)? as usize;
    let rows = read_u32_be(bytes, 8)? as usize;
    let cols = read_u32_be(bytes, 12)? as usize;
    if rows != HEIGHT || cols != WIDTH {
        return Err(DatasetError::BadDimensions { rows, cols });
    }

    let payload = &bytes[16..];
    let expected = count * HEIGHT * WIDTH;
    if payload.len() < expected {
        return Err(DatasetError::Truncated {
            expected: 16 + expected,
            found: bytes.len(),
        });
    }

    Ok(payload[..expected]
        .chunks(HEIGHT * WIDTH)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Parses an IDX1 labels file.
///
/// Layout (big-endian): magic `0x00000801`, count, then `count` bytes.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>, DatasetError> {
    check_magic(bytes, LABELS_MAGIC)?;
    let count = read_u32_be(bytes, 4)? as usize;

    let payload = &bytes[8..];
    if payload.len() < count {
        return Err(DatasetError::Truncated {
            expected: 8 + count,
            found: bytes.len(),
        });
    }

    Ok(payload[..count].to_vec())
}
