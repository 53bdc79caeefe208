use std::{
    fmt::{Display, Formatter, Result},
    num::NonZeroU32,
};

// simplified form of real imap sequence set.
// this struct only takes a single number or a range instead of full blown vector of
// numbers/ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSet {
    from: NonZeroU32,
    to: Option<NonZeroU32>,
}

impl SequenceSet {
    pub fn single(from: NonZeroU32) -> Self {
        Self { from, to: None }
    }

    pub fn range(from: NonZeroU32, to: NonZeroU32) -> Self {
        debug_assert!(from <= to, "sequence range end should not precede its start");
        if from == to {
            Self::single(from)
        } else {
            Self { from, to: Some(to) }
        }
    }

    /// Sequence numbers `1..=exists`, or `None` for an empty folder.
    pub fn first(exists: u32) -> Option<Self> {
        NonZeroU32::new(exists).map(|to| Self::range(NonZeroU32::MIN, to))
    }

    pub fn count(&self) -> usize {
        self.to.map_or(1, |to| {
            usize::try_from(to.get() - self.from.get())
                .expect("converting u32 to usize should succeed")
                + 1
        })
    }
}

impl Display for SequenceSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if let Some(to) = self.to {
            write!(f, "{}:{}", self.from, to)
        } else {
            write!(f, "{}", self.from)
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_empty_folder_has_no_sequence_set() {
        assert_none!(SequenceSet::first(0));
    }

    #[rstest]
    #[case(1, "1", 1)]
    #[case(2, "1:2", 2)]
    #[case(6106, "1:6106", 6106)]
    fn test_first_covers_all_messages(
        #[case] exists: u32,
        #[case] expected: &str,
        #[case] count: usize,
    ) {
        let set = assert_some!(SequenceSet::first(exists));
        assert_eq!(expected, set.to_string());
        assert_eq!(count, set.count());
    }
}
