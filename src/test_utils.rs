pub mod test_helpers {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use crate::render::{Bitmap, PageSource, RenderFailure, SyntheticDocument, Variant};

    /// One rasterize call seen by a [`ScriptedDocument`]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RenderCall {
        pub page: usize,
        pub width: u32,
        pub height: u32,
        pub variant: Variant,
    }

    /// Synthetic document with scripted failures and a call log
    pub struct ScriptedDocument {
        inner: SyntheticDocument,
        broken_pages: HashSet<usize>,
        transient_failures: RefCell<HashMap<usize, u32>>,
        calls: RefCell<Vec<RenderCall>>,
    }

    impl ScriptedDocument {
        pub fn new(page_count: usize) -> Self {
            Self::with_notes(page_count, false)
        }

        pub fn with_notes(page_count: usize, notes: bool) -> Self {
            Self {
                inner: SyntheticDocument::new(page_count, notes),
                broken_pages: HashSet::new(),
                transient_failures: RefCell::new(HashMap::new()),
                calls: RefCell::new(Vec::new()),
            }
        }

        /// Page always fails to render
        pub fn broken_page(mut self, page: usize) -> Self {
            self.broken_pages.insert(page);
            self
        }

        /// Page fails the next `times` render attempts
        pub fn flaky_page(self, page: usize, times: u32) -> Self {
            self.transient_failures.borrow_mut().insert(page, times);
            self
        }

        pub fn calls(&self) -> Vec<RenderCall> {
            self.calls.borrow().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }

        pub fn calls_for_page(&self, page: usize) -> usize {
            self.calls.borrow().iter().filter(|c| c.page == page).count()
        }

        pub fn clear_calls(&self) {
            self.calls.borrow_mut().clear();
        }
    }

    impl PageSource for ScriptedDocument {
        fn page_count(&self) -> usize {
            self.inner.page_count()
        }

        fn rasterize(
            &self,
            page: usize,
            width: u32,
            height: u32,
            variant: Variant,
        ) -> Result<Bitmap, RenderFailure> {
            self.calls.borrow_mut().push(RenderCall {
                page,
                width,
                height,
                variant,
            });

            if self.broken_pages.contains(&page) {
                return Err(RenderFailure::generic(format!(
                    "malformed content on page {page}"
                )));
            }

            if let Some(remaining) = self.transient_failures.borrow_mut().get_mut(&page) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(RenderFailure::generic(format!(
                        "transient failure on page {page}"
                    )));
                }
            }

            self.inner.rasterize(page, width, height, variant)
        }

        fn has_secondary_content(&self) -> bool {
            self.inner.has_secondary_content()
        }
    }
}
