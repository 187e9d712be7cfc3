//! Per-layer HTTP method filter.
//!
//! Methods themselves are [`http::Method`]; this module only decides which
//! of them a layer answers. An empty filter answers every method. A filter
//! holding `GET` also answers `HEAD`, the body is dropped later by the
//! response.

use std::fmt;

use http::Method;

/// The set of methods a layer accepts.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MethodFilter {
    methods: Vec<Method>,
}

impl MethodFilter {
    /// Accepts every method (middleware, `all`).
    pub fn any() -> Self {
        Self::default()
    }

    /// Accepts exactly `method` (plus `HEAD` when `method` is `GET`).
    pub fn only(method: Method) -> Self {
        Self { methods: vec![method] }
    }

    pub fn is_any(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn accepts(&self, method: &Method) -> bool {
        if self.methods.is_empty() || self.methods.contains(method) {
            return true;
        }
        *method == Method::HEAD && self.methods.contains(&Method::GET)
    }

    /// Methods to advertise in an `Allow` header for this layer.
    pub(crate) fn advertised(&self) -> impl Iterator<Item = Method> + '_ {
        let head = self.methods.contains(&Method::GET) && !self.methods.contains(&Method::HEAD);
        self.methods.iter().cloned().chain(head.then_some(Method::HEAD))
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.methods.is_empty() {
            return f.write_str("*");
        }
        for (i, m) in self.methods.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(m.as_str())?;
        }
        Ok(())
    }
}

/// Collects the methods seen while dispatching an `OPTIONS` request, in
/// first-seen order and without duplicates.
#[derive(Debug, Default)]
pub(crate) struct AllowList(Vec<Method>);

impl AllowList {
    pub(crate) fn extend_from(&mut self, filter: &MethodFilter) {
        for m in filter.advertised() {
            if !self.0.contains(&m) {
                self.0.push(m);
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Allow` header value, e.g. `GET,HEAD,POST`.
    pub(crate) fn header_value(&self) -> String {
        self.0.iter().map(Method::as_str).collect::<Vec<_>>().join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_accepts_everything() {
        let f = MethodFilter::any();
        assert!(f.accepts(&Method::DELETE));
        assert!(f.is_any());
    }

    #[test]
    fn get_serves_head() {
        let f = MethodFilter::only(Method::GET);
        assert!(f.accepts(&Method::HEAD));
        assert!(!f.accepts(&Method::POST));
        assert!(!MethodFilter::only(Method::POST).accepts(&Method::HEAD));
    }

    #[test]
    fn allow_list_dedupes_and_adds_head() {
        let mut allow = AllowList::default();
        allow.extend_from(&MethodFilter::only(Method::GET));
        allow.extend_from(&MethodFilter::only(Method::POST));
        allow.extend_from(&MethodFilter::only(Method::GET));
        assert_eq!(allow.header_value(), "GET,HEAD,POST");
    }
}
