use tp_filter::FilterElement;
use tp_transform::TransformElement;

/// Opaque transform element handle.
pub struct TPTransform {
    pub(crate) element: TransformElement,
}

impl Default for TPTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl TPTransform {
    pub fn new() -> Self {
        Self {
            element: TransformElement::new(),
        }
    }
}

/// Opaque filter element handle. Dropping it closes the back-end.
pub struct TPFilter {
    pub(crate) element: FilterElement,
}

impl Default for TPFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TPFilter {
    pub fn new() -> Self {
        Self {
            element: FilterElement::new(),
        }
    }
}
