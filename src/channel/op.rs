//! Single destination-channel operations

use std::fmt;

/// How one destination channel is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Copy a source channel
    Select(u8),
    /// Write a literal value
    Constant(i32),
    /// Sum of two source channels
    Add(u8, u8),
    /// Source channel plus a literal
    AddConstant(u8, i32),
    /// Difference of two source channels
    Subtract(u8, u8),
    /// Source channel minus a literal
    SubtractConstant(u8, i32),
}

/// One entry of a routing plan, producing exactly one destination channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelOp {
    pub kind: OpKind,
    pub dst: u8,
}

impl ChannelOp {
    pub fn new(kind: OpKind, dst: u8) -> Self {
        Self { kind, dst }
    }

    pub fn select(src: u8, dst: u8) -> Self {
        Self::new(OpKind::Select(src), dst)
    }

    /// Source channels read by this op
    pub fn sources(&self) -> impl Iterator<Item = u8> {
        let (a, b) = match self.kind {
            OpKind::Select(s) | OpKind::AddConstant(s, _) | OpKind::SubtractConstant(s, _) => {
                (Some(s), None)
            }
            OpKind::Add(s1, s2) | OpKind::Subtract(s1, s2) => (Some(s1), Some(s2)),
            OpKind::Constant(_) => (None, None),
        };
        a.into_iter().chain(b)
    }

    pub fn is_select(&self) -> bool {
        matches!(self.kind, OpKind::Select(_))
    }
}

impl fmt::Display for ChannelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OpKind::Select(s) => write!(f, "{}", s),
            OpKind::Constant(v) => write!(f, "d{}", v),
            OpKind::Add(a, b) => write!(f, "+{}{}", a, b),
            OpKind::AddConstant(a, v) => write!(f, "+{}d{}", a, v),
            OpKind::Subtract(a, b) => write!(f, "-{}{}", a, b),
            OpKind::SubtractConstant(a, v) => write!(f, "-{}d{}", a, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources() {
        let op = ChannelOp::new(OpKind::Add(1, 3), 0);
        assert_eq!(op.sources().collect::<Vec<_>>(), vec![1, 3]);

        let op = ChannelOp::new(OpKind::Constant(9), 0);
        assert_eq!(op.sources().count(), 0);

        let op = ChannelOp::new(OpKind::SubtractConstant(2, 100), 1);
        assert_eq!(op.sources().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_display() {
        assert_eq!(ChannelOp::select(4, 0).to_string(), "4");
        assert_eq!(ChannelOp::new(OpKind::Constant(-12), 0).to_string(), "d-12");
        assert_eq!(ChannelOp::new(OpKind::AddConstant(1, 250), 0).to_string(), "+1d250");
        assert_eq!(ChannelOp::new(OpKind::Subtract(0, 1), 0).to_string(), "-01");
    }
}
