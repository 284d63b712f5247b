use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a legacy feed post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Text,
    Image,
    Video,
    Blog,
}

impl PostType {
    pub const ALL: [PostType; 4] = [Self::Text, Self::Image, Self::Video, Self::Blog];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Blog => "blog",
        }
    }
}

/// Kind of a unified feed post. Each kind fills its own set of optional columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPostType {
    Blog,
    Project,
    Normal,
}

impl FeedPostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Project => "project",
            Self::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Classifies an upload by its MIME type. Anything other than
    /// `image/*` or `video/*` is unsupported.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct.starts_with("image/") {
            Some(Self::Image)
        } else if ct.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! impl_from_str {
    ($ty:ty, $($name:literal => $variant:expr),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_from_str!(PostType,
    "text" => PostType::Text,
    "image" => PostType::Image,
    "video" => PostType::Video,
    "blog" => PostType::Blog,
);

impl_from_str!(FeedPostType,
    "blog" => FeedPostType::Blog,
    "project" => FeedPostType::Project,
    "normal" => FeedPostType::Normal,
);

impl_from_str!(MediaType,
    "image" => MediaType::Image,
    "video" => MediaType::Video,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_type_parses_known_names() {
        for t in PostType::ALL {
            assert_eq!(t.as_str().parse::<PostType>().unwrap(), t);
        }
        assert!("story".parse::<PostType>().is_err());
    }

    #[test]
    fn media_type_from_content_type() {
        assert_eq!(MediaType::from_content_type("image/png"), Some(MediaType::Image));
        assert_eq!(MediaType::from_content_type("Video/MP4"), Some(MediaType::Video));
        assert_eq!(MediaType::from_content_type("application/pdf"), None);
        assert_eq!(MediaType::from_content_type(""), None);
    }
}
