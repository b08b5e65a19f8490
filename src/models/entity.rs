//! Entity kinds that can carry an uploaded image.
//!
//! Table and column identifiers are resolved here from closed enums so that no
//! request-supplied string ever reaches an SQL statement as an identifier.

use std::{fmt, str::FromStr};

/// Logical storage partition, one per entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Communities,
    Businesses,
}

impl BucketKind {
    pub const ALL: [BucketKind; 2] = [BucketKind::Communities, BucketKind::Businesses];

    /// Bucket name as used by the object store and in public URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            BucketKind::Communities => "communities",
            BucketKind::Businesses => "businesses",
        }
    }

    /// Relational table holding entities of this kind.
    pub fn table(self) -> &'static str {
        match self {
            BucketKind::Communities => "communities",
            BucketKind::Businesses => "businesses",
        }
    }

    /// Column naming the user that owns a row.
    pub fn owner_column(self) -> &'static str {
        match self {
            BucketKind::Communities => "created_by",
            BucketKind::Businesses => "owner_id",
        }
    }

    /// The image slot this table carries.
    pub fn image_kind(self) -> ImageKind {
        match self {
            BucketKind::Communities => ImageKind::Cover,
            BucketKind::Businesses => ImageKind::Logo,
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBucketKind(pub String);

impl FromStr for BucketKind {
    type Err = UnknownBucketKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BucketKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownBucketKind(s.to_string()))
    }
}

/// Which image slot of an entity an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Cover,
    Logo,
}

impl ImageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageKind::Cover => "cover",
            ImageKind::Logo => "logo",
        }
    }

    /// Column that stores the public URL for this slot.
    pub fn column(self) -> &'static str {
        match self {
            ImageKind::Cover => "cover_image_url",
            ImageKind::Logo => "logo_url",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownImageKind(pub String);

impl FromStr for ImageKind {
    type Err = UnknownImageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cover" => Ok(ImageKind::Cover),
            "logo" => Ok(ImageKind::Logo),
            other => Err(UnknownImageKind(other.to_string())),
        }
    }
}
