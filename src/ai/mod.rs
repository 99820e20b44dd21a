mod rewriter;

pub use rewriter::{
    fallback_rewrite, first_json_object, parse_reply, truncate_chars, GeminiRewriter,
    RewriteOutput, Rewriter, MAX_EXCERPT_CHARS,
};
