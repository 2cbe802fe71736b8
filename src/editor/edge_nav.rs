/// Per-view state behind the one-keypress pause at inline code boundaries.
///
/// A park sets both flags. After every applied transaction the view calls
/// [`EdgeNavigation::view_updated`], which clears `code_mark_next_char`
/// unless that transaction was the park itself, and always clears
/// `just_marked`. The park command refuses to fire while
/// `code_mark_next_char` is set, so the next identical arrow press falls
/// through to the normal caret motion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeNavigation {
    just_marked: bool,
    code_mark_next_char: bool,
}

impl EdgeNavigation {
    pub fn new() -> Self {
        Self::default()
    }

    /// True only between a park and the view update that follows it.
    pub fn just_marked(&self) -> bool {
        self.just_marked
    }

    /// True while the caret is parked on a code boundary.
    pub fn code_mark_next_char(&self) -> bool {
        self.code_mark_next_char
    }

    pub fn park(&mut self) {
        self.just_marked = true;
        self.code_mark_next_char = true;
    }

    pub fn view_updated(&mut self) {
        if !self.just_marked {
            self.code_mark_next_char = false;
        }
        self.just_marked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn park_survives_exactly_one_update() {
        let mut edge = EdgeNavigation::new();
        edge.park();
        edge.view_updated();
        assert!(edge.code_mark_next_char());
        assert!(!edge.just_marked());

        edge.view_updated();
        assert!(!edge.code_mark_next_char());
    }

    #[test]
    fn updates_without_park_keep_flags_clear() {
        let mut edge = EdgeNavigation::new();
        edge.view_updated();
        assert_eq!(edge, EdgeNavigation::default());
    }
}
