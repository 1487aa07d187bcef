use crate::util::fast_map::{FastHashMap, FastHashSet, fast_hash_map_new, fast_hash_set_new};

use super::NodeId;

/// How a string constant was quoted in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteStyle {
    Single,
    Double,
    TripleSingle,
    TripleDouble,
    Slashy,
}

impl QuoteStyle {
    pub fn from_delimiter(raw: &str) -> Option<QuoteStyle> {
        if raw.starts_with("'''") {
            Some(QuoteStyle::TripleSingle)
        } else if raw.starts_with("\"\"\"") {
            Some(QuoteStyle::TripleDouble)
        } else if raw.starts_with('\'') {
            Some(QuoteStyle::Single)
        } else if raw.starts_with('"') {
            Some(QuoteStyle::Double)
        } else if raw.starts_with('/') {
            Some(QuoteStyle::Slashy)
        } else {
            None
        }
    }

    pub fn delimiter(&self) -> &'static str {
        match self {
            QuoteStyle::Single => "'",
            QuoteStyle::Double => "\"",
            QuoteStyle::TripleSingle => "'''",
            QuoteStyle::TripleDouble => "\"\"\"",
            QuoteStyle::Slashy => "/",
        }
    }

    pub fn interpolates(&self) -> bool {
        matches!(self, QuoteStyle::Double | QuoteStyle::TripleDouble | QuoteStyle::Slashy)
    }
}

/// Side tables written by the builder and read by formatters and analysis passes.
#[derive(Debug, Clone, PartialEq)]
pub struct AstMeta {
    quote_styles: FastHashMap<NodeId, QuoteStyle>,
    paren_depth: FastHashMap<NodeId, u32>,
    named_args: FastHashSet<NodeId>,
    verbatim_numbers: FastHashMap<NodeId, String>,
}

impl Default for AstMeta {
    fn default() -> Self {
        Self {
            quote_styles: fast_hash_map_new(),
            paren_depth: fast_hash_map_new(),
            named_args: fast_hash_set_new(),
            verbatim_numbers: fast_hash_map_new(),
        }
    }
}

impl AstMeta {
    pub fn quote_style(&self, id: NodeId) -> Option<QuoteStyle> {
        self.quote_styles.get(&id).copied()
    }

    pub(crate) fn set_quote_style(&mut self, id: NodeId, style: QuoteStyle) {
        self.quote_styles.insert(id, style);
    }

    /// Number of parentheses wrapped around an expression; 0 when unwrapped.
    pub fn paren_depth(&self, id: NodeId) -> u32 {
        self.paren_depth.get(&id).copied().unwrap_or(0)
    }

    pub(crate) fn set_paren_depth(&mut self, id: NodeId, depth: u32) {
        if depth > 0 {
            self.paren_depth.insert(id, depth);
        } else {
            self.paren_depth.remove(&id);
        }
    }

    /// True for the map argument that collects a call's `name: value` arguments.
    pub fn is_named_args(&self, id: NodeId) -> bool {
        self.named_args.contains(&id)
    }

    pub(crate) fn mark_named_args(&mut self, id: NodeId) {
        self.named_args.insert(id);
    }

    /// Number literal exactly as written (`0x1F`, `2.5d`, `1_000`).
    pub fn verbatim_number(&self, id: NodeId) -> Option<&str> {
        self.verbatim_numbers.get(&id).map(String::as_str)
    }

    pub(crate) fn set_verbatim_number(&mut self, id: NodeId, text: String) {
        self.verbatim_numbers.insert(id, text);
    }
}
