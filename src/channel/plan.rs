//! Compiled routing plans and their classification

use std::fmt;

use crate::channel::op::{ChannelOp, OpKind};
use crate::constants::MAX_PERMUTE_CHANNELS;

/// How cheaply a plan can be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    /// Destination equals source, a straight copy
    Identity,
    /// Pure channel selection, a table lookup per sample
    Permute,
    /// Needs per-sample arithmetic
    General,
}

/// The compiled channel routing for one consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPlan {
    ops: Vec<ChannelOp>,
    /// Source channel per destination channel, only for Identity and Permute
    map: Vec<u8>,
    kind: PlanKind,
    source_channels: usize,
    output_channels: usize,
}

impl RoutingPlan {
    /// Plan that passes `channels` channels through unchanged
    pub fn identity(channels: usize) -> Self {
        let ops = (0..channels.min(crate::constants::MAX_CHANNEL_OPS))
            .map(|i| ChannelOp::select(i as u8, i as u8))
            .collect();
        classify(ops, channels, 0)
    }

    /// Plan for a subscribe mask.
    ///
    /// Set bits are taken from bit 0 upward, each selecting that source channel
    /// into the next destination slot. Bits at or above `source_channels` are
    /// ignored and at most [`MAX_PERMUTE_CHANNELS`] bits are used.
    pub fn from_mask(mask: u32, source_channels: usize) -> Self {
        let ops = (0..32u8)
            .filter(|&bit| (bit as usize) < source_channels && mask & (1 << bit) != 0)
            .take(MAX_PERMUTE_CHANNELS)
            .enumerate()
            .map(|(dst, src)| ChannelOp::select(src, dst as u8))
            .collect();
        classify(ops, source_channels, 0)
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn ops(&self) -> &[ChannelOp] {
        &self.ops
    }

    /// Source channel for each destination channel, if the plan is a pure selection
    pub fn permutation(&self) -> Option<&[u8]> {
        match self.kind {
            PlanKind::Identity | PlanKind::Permute => Some(&self.map),
            PlanKind::General => None,
        }
    }

    pub fn source_channels(&self) -> usize {
        self.source_channels
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    pub fn is_identity(&self) -> bool {
        self.kind == PlanKind::Identity
    }
}

impl fmt::Display for RoutingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

/// Reduce an op list to the cheapest plan kind that computes it.
///
/// The output channel count is `requested_outputs`, or one more than the
/// largest destination index when that is zero.
pub fn classify(ops: Vec<ChannelOp>, source_channels: usize, requested_outputs: usize) -> RoutingPlan {
    let output_channels = if requested_outputs == 0 {
        ops.iter().map(|op| op.dst as usize + 1).max().unwrap_or(0)
    } else {
        requested_outputs
    };

    let table = ops.len() <= MAX_PERMUTE_CHANNELS
        && ops.len() == output_channels
        && ops
            .iter()
            .enumerate()
            .all(|(i, op)| op.is_select() && op.dst as usize == i);

    let (kind, map) = if table {
        let map: Vec<u8> = ops
            .iter()
            .filter_map(|op| match op.kind {
                OpKind::Select(src) => Some(src),
                _ => None,
            })
            .collect();
        let identity = output_channels == source_channels
            && map.iter().enumerate().all(|(i, &src)| src as usize == i);
        if identity {
            (PlanKind::Identity, map)
        } else {
            (PlanKind::Permute, map)
        }
    } else {
        (PlanKind::General, Vec::new())
    };

    RoutingPlan {
        ops,
        map,
        kind,
        source_channels,
        output_channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::parse_spec;

    #[test]
    fn test_identity() {
        let plan = parse_spec("01", 2, 0).unwrap();
        assert_eq!(plan.kind(), PlanKind::Identity);
        assert_eq!(plan.output_channels(), 2);
    }

    #[test]
    fn test_identity_needs_matching_counts() {
        // same selects, but the source has a third channel
        let plan = parse_spec("01", 3, 0).unwrap();
        assert_eq!(plan.kind(), PlanKind::Permute);
    }

    #[test]
    fn test_swap_is_permute() {
        let plan = parse_spec("10", 2, 0).unwrap();
        assert_eq!(plan.kind(), PlanKind::Permute);
        assert_eq!(plan.permutation(), Some(&[1u8, 0][..]));
    }

    #[test]
    fn test_arithmetic_is_general() {
        let plan = parse_spec("+01", 2, 0).unwrap();
        assert_eq!(plan.kind(), PlanKind::General);
        assert_eq!(plan.ops(), &[ChannelOp::new(OpKind::Add(0, 1), 0)]);
        assert_eq!(plan.output_channels(), 1);
        assert!(plan.permutation().is_none());
    }

    #[test]
    fn test_wide_select_is_general() {
        let plan = parse_spec("0123456789", 10, 0).unwrap();
        assert_eq!(plan.kind(), PlanKind::General);
        assert_eq!(plan.output_channels(), 10);
    }

    #[test]
    fn test_requested_outputs_beyond_ops() {
        let plan = parse_spec("10", 2, 4).unwrap();
        assert_eq!(plan.kind(), PlanKind::General);
        assert_eq!(plan.output_channels(), 4);
    }

    #[test]
    fn test_mask() {
        let plan = RoutingPlan::from_mask(0b101, 3);
        assert_eq!(plan.kind(), PlanKind::Permute);
        assert_eq!(plan.permutation(), Some(&[0u8, 2][..]));
        assert_eq!(plan.output_channels(), 2);
    }

    #[test]
    fn test_mask_ignores_missing_sources() {
        let plan = RoutingPlan::from_mask(0b1111, 2);
        assert_eq!(plan.kind(), PlanKind::Identity);
        assert_eq!(plan.output_channels(), 2);
    }

    #[test]
    fn test_mask_capped() {
        let plan = RoutingPlan::from_mask(0xffff, 16);
        assert_eq!(plan.output_channels(), MAX_PERMUTE_CHANNELS);
        assert_eq!(plan.kind(), PlanKind::Permute);
    }

    #[test]
    fn test_eight_select_map_is_permute() {
        let plan = parse_spec("76543210", 8, 0).unwrap();
        assert_eq!(plan.kind(), PlanKind::Permute);
        assert_eq!(plan.permutation(), Some(&[7u8, 6, 5, 4, 3, 2, 1, 0][..]));

        let nine = parse_spec("876543210", 9, 0).unwrap();
        assert_eq!(nine.kind(), PlanKind::General);
    }

    #[test]
    fn test_display_parses_back() {
        for text in ["10", "+01,d-3,z", "-1d40,2,+00"] {
            let plan = parse_spec(text, 3, 0).unwrap();
            let again = parse_spec(&plan.to_string(), 3, 0).unwrap();
            assert_eq!(plan, again);
        }
    }
}
