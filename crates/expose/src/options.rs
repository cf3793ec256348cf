use mime::Mime;

/// Protocol level options applied when a successful result is written.
///
/// The default is no caching, a `text/html` content type and no compression. A result
/// that carries no options is written with the dispatcher's default options.
///
/// # Example
/// ```
/// use micro_expose::ResponseOptions;
///
/// let options = ResponseOptions::default()
///     .with_cache(300)
///     .with_content_type(mime::APPLICATION_JSON)
///     .with_compression(true);
///
/// assert_eq!(options.cache(), 300);
/// assert_eq!(options.content_type(), Some(&mime::APPLICATION_JSON));
/// assert!(options.compression());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseOptions {
    cache: u64,
    content_type: Option<Mime>,
    compression: bool,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self { cache: 0, content_type: Some(mime::TEXT_HTML), compression: false }
    }
}

impl ResponseOptions {
    /// Seconds the response may be cached for, `0` sets no caching directive.
    #[must_use]
    pub fn with_cache(mut self, seconds: u64) -> Self {
        self.cache = seconds;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Leave the `Content-Type` header unset.
    #[must_use]
    pub fn without_content_type(mut self) -> Self {
        self.content_type = None;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    pub fn cache(&self) -> u64 {
        self.cache
    }

    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    pub fn compression(&self) -> bool {
        self.compression
    }
}
