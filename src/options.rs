//! Parser configuration

/// What the parser does with a tag id it has no decoder for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTagPolicy {
    /// Step over the record and keep going.
    #[default]
    Skip,
    /// Fail with [`crate::ImageError::UnknownTag`].
    Reject,
}

/// Options for parsing an image
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Handling of unrecognized tag ids
    pub unknown_tags: UnknownTagPolicy,
    /// Largest buffer accepted, in bytes (None = unlimited)
    pub max_image_size: Option<usize>,
    /// Largest number of records accepted (None = unlimited)
    pub max_records: Option<usize>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, but unknown tags are rejected
    pub fn strict() -> Self {
        Self::default().with_unknown_tags(UnknownTagPolicy::Reject)
    }

    pub fn with_unknown_tags(mut self, policy: UnknownTagPolicy) -> Self {
        self.unknown_tags = policy;
        self
    }

    pub fn with_max_image_size(mut self, bytes: usize) -> Self {
        self.max_image_size = Some(bytes);
        self
    }

    pub fn with_max_records(mut self, count: usize) -> Self {
        self.max_records = Some(count);
        self
    }
}
