use std::fmt;
use thiserror::Error;

pub const NUM_CLASSES: usize = 10;

/// Class names, indexed by label.
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "T-shirt/top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle boot",
];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("label {label} is outside of the {} known classes", NUM_CLASSES)]
pub struct ClassError {
    pub label: usize,
}

/// The Fashion-MNIST label taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FashionClass {
    TShirtTop,
    Trouser,
    Pullover,
    Dress,
    Coat,
    Sandal,
    Shirt,
    Sneaker,
    Bag,
    AnkleBoot,
}

impl FashionClass {
    pub const ALL: [Self; NUM_CLASSES] = [
        Self::TShirtTop,
        Self::Trouser,
        Self::Pullover,
        Self::Dress,
        Self::Coat,
        Self::Sandal,
        Self::Shirt,
        Self::Sneaker,
        Self::Bag,
        Self::AnkleBoot,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        CLASS_NAMES[self.index()]
    }
}

impl TryFrom<usize> for FashionClass {
    type Error = ClassError;

    fn try_from(label: usize) -> Result<Self, Self::Error> {
        Self::ALL.get(label).copied().ok_or(ClassError { label })
    }
}

impl TryFrom<u8> for FashionClass {
    type Error = ClassError;

    fn try_from(label: u8) -> Result<Self, Self::Error> {
        Self::try_from(label as usize)
    }
}

impl fmt::Display for FashionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_index_into_names() {
        for (label, class) in FashionClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), label);
            assert_eq!(FashionClass::try_from(label), Ok(*class));
        }
        assert_eq!(FashionClass::Sandal.name(), "Sandal");
        assert_eq!(FashionClass::AnkleBoot.to_string(), "Ankle boot");
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        assert_eq!(
            FashionClass::try_from(10usize),
            Err(ClassError { label: 10 })
        );
        assert!(FashionClass::try_from(255u8).is_err());
    }
}
