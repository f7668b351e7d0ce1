// Declared handler signatures, validated at registration time

/// What a handler declares as its return type.
///
/// `Unit` is an explicit "returns no value" declaration and is distinct from
/// not declaring a return type at all (`HandlerSignature` with no
/// annotation), which HTTP validation rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnAnnotation {
    /// Explicitly declared as returning nothing.
    Unit,
    /// Declared as returning a redirect result.
    Redirect,
    /// Declared as returning a file result.
    File,
    /// Any other value kind.
    Value,
}

/// The formal parameters and return annotation a handler declares.
///
/// Built explicitly at registration since the validator has no runtime
/// reflection to inspect; the protocol validators check it before the
/// application can serve traffic.
#[derive(Debug, Clone, Default)]
pub struct HandlerSignature {
    params: Vec<String>,
    return_annotation: Option<ReturnAnnotation>,
}

impl HandlerSignature {
    /// A signature with no parameters and no return annotation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a formal parameter name.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Declare the return annotation.
    pub fn returns(mut self, annotation: ReturnAnnotation) -> Self {
        self.return_annotation = Some(annotation);
        self
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn return_annotation(&self) -> Option<ReturnAnnotation> {
        self.return_annotation
    }
}
