/// Language options affecting resolution behavior.
#[derive(Copy, Clone, Debug, Default)]
pub struct LangOptions {
    /// Pedantic mode (strict standards compliance). Gates the
    /// missing-array-size, zero-size-array and empty-declaration warnings.
    pub pedantic: bool,
}

impl LangOptions {
    pub fn pedantic() -> Self {
        LangOptions { pedantic: true }
    }
}
