use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

/// What an [`Extractor`] receives: the original input alongside whatever a
/// prior extractor in the same pass may have rewritten, plus an optional
/// caller-supplied id.
pub struct ExtractorContext<'a> {
    pub original: &'a str,
    pub code: &'a str,
    pub id: Option<&'a str>,
}

/// A token extractor: scans source text and yields candidate raw tokens.
/// Extractors may be asynchronous; [`apply_extractors`] runs them
/// sequentially over the same context and unions their results.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, ctx: &ExtractorContext<'_>) -> HashSet<String>;
}

/// Run every extractor over `code` and union their results into `acc`.
pub async fn apply_extractors(
    extractors: &[Arc<dyn Extractor>],
    code: &str,
    id: Option<&str>,
    acc: &mut HashSet<String>,
) {
    let ctx = ExtractorContext {
        original: code,
        code,
        id,
    };
    for extractor in extractors {
        acc.extend(extractor.extract(&ctx).await);
    }
}

/// A default extractor: splits on CSS-class-like whitespace/quote/bracket
/// boundaries using a single pass regex, the way a minimal class-attribute
/// scanner would. Grounded as the "at least one default extractor" callers
/// can register without writing their own.
pub struct WhitespaceTokenExtractor {
    re: regex::Regex,
}

impl Default for WhitespaceTokenExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl WhitespaceTokenExtractor {
    #[must_use]
    pub fn new() -> Self {
        #[allow(clippy::unwrap_used)]
        let re = regex::Regex::new(r#"[a-zA-Z0-9_:/.\[\]=~"%#-]+"#).unwrap();
        Self { re }
    }
}

#[async_trait]
impl Extractor for WhitespaceTokenExtractor {
    async fn extract(&self, ctx: &ExtractorContext<'_>) -> HashSet<String> {
        self.re
            .find_iter(ctx.code)
            .map(|m| m.as_str().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}
