//! Channel map text parser
//!
//! Grammar, scanned left to right, one destination channel per token:
//!
//! | token      | meaning                               |
//! |------------|---------------------------------------|
//! | `d`        | select source channel `d`             |
//! | `+ab`      | source `a` plus source `b`            |
//! | `-ab`      | source `a` minus source `b`           |
//! | `+adN`     | source `a` plus the literal `N`       |
//! | `-adN`     | source `a` minus the literal `N`      |
//! | `dN`,`d±N` | the literal `N`                       |
//! | `z`        | the literal 0                         |
//! | `,`        | separator, produces nothing           |
//!
//! The whole string `auto` instead requests a round-robin map.

use crate::channel::op::{ChannelOp, OpKind};
use crate::channel::plan::{classify, RoutingPlan};
use crate::constants::{MAX_CHANNELS, MAX_CHANNEL_OPS};
use crate::error::ChannelError;

/// A syntax-checked channel map, not yet bound to a source channel count
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSpec {
    /// Round-robin: destination `i` selects source `i % sources`
    Auto,
    /// Explicit ops, destination index equal to token position
    Ops(Vec<ChannelOp>),
}

impl ChannelSpec {
    /// Check the syntax of a channel map
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        if text == "auto" {
            return Ok(ChannelSpec::Auto);
        }
        Scanner::new(text).run().map(ChannelSpec::Ops)
    }

    /// Bind to a source channel count and classify.
    ///
    /// `requested_outputs == 0` derives the output count from the ops.
    pub fn compile(
        &self,
        source_channels: usize,
        requested_outputs: usize,
    ) -> Result<RoutingPlan, ChannelError> {
        if source_channels == 0 {
            return Err(ChannelError::NoSourceChannels);
        }
        if requested_outputs > MAX_CHANNELS {
            return Err(ChannelError::TooManyOutputs(requested_outputs));
        }

        match self {
            ChannelSpec::Auto => {
                let count = if requested_outputs == 0 {
                    source_channels
                } else {
                    requested_outputs
                };
                let ops: Vec<ChannelOp> = (0..count.min(MAX_CHANNEL_OPS))
                    .map(|i| ChannelOp::select((i % source_channels) as u8, i as u8))
                    .collect();
                Ok(classify(ops, source_channels, requested_outputs))
            }
            ChannelSpec::Ops(ops) => {
                for op in ops {
                    if let Some(index) = op.sources().find(|&s| s as usize >= source_channels) {
                        return Err(ChannelError::SourceOutOfRange {
                            index,
                            channels: source_channels,
                        });
                    }
                }
                Ok(classify(ops.clone(), source_channels, requested_outputs))
            }
        }
    }
}

/// Parse, bind and classify a channel map in one step
pub fn parse_spec(
    text: &str,
    source_channels: usize,
    requested_outputs: usize,
) -> Result<RoutingPlan, ChannelError> {
    ChannelSpec::parse(text)?.compile(source_channels, requested_outputs)
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn run(mut self) -> Result<Vec<ChannelOp>, ChannelError> {
        let mut ops = Vec::new();

        while self.pos < self.bytes.len() {
            if ops.len() == MAX_CHANNEL_OPS {
                let rest = &self.text[self.pos..];
                if rest.bytes().any(|b| b != b',') {
                    tracing::warn!(
                        spec = self.text,
                        ignored = rest,
                        "channel map truncated at {} ops",
                        MAX_CHANNEL_OPS
                    );
                }
                break;
            }

            let dst = ops.len() as u8;
            let kind = match self.bytes[self.pos] {
                b',' => {
                    self.pos += 1;
                    continue;
                }
                b'+' => self.binary(true)?,
                b'-' => self.binary(false)?,
                b'd' => {
                    self.pos += 1;
                    OpKind::Constant(self.signed_literal()?)
                }
                b'z' => {
                    self.pos += 1;
                    OpKind::Constant(0)
                }
                c if c.is_ascii_digit() => {
                    self.pos += 1;
                    OpKind::Select(c - b'0')
                }
                _ => return Err(self.syntax(self.pos)),
            };
            ops.push(ChannelOp::new(kind, dst));
        }

        Ok(ops)
    }

    /// `+ab`, `-ab`, `+adN`, `-adN`; `pos` is on the operator
    fn binary(&mut self, add: bool) -> Result<OpKind, ChannelError> {
        let src1 = self.digit_at(self.pos + 1).ok_or_else(|| self.syntax(self.pos + 1))?;

        if self.bytes.get(self.pos + 2) == Some(&b'd') && self.digit_at(self.pos + 3).is_some() {
            self.pos += 3;
            let value = self.literal(false)?;
            return Ok(if add {
                OpKind::AddConstant(src1, value)
            } else {
                OpKind::SubtractConstant(src1, value)
            });
        }

        let src2 = self.digit_at(self.pos + 2).ok_or_else(|| self.syntax(self.pos + 2))?;
        self.pos += 3;
        Ok(if add {
            OpKind::Add(src1, src2)
        } else {
            OpKind::Subtract(src1, src2)
        })
    }

    /// Optional sign followed by a decimal literal
    fn signed_literal(&mut self) -> Result<i32, ChannelError> {
        let negative = match self.bytes.get(self.pos) {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            Some(b'+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        self.literal(negative)
    }

    fn literal(&mut self, negative: bool) -> Result<i32, ChannelError> {
        let start = self.pos;
        if self.digit_at(start).is_none() {
            return Err(self.syntax(start));
        }

        let mut value: i64 = 0;
        while let Some(d) = self.digit_at(self.pos) {
            value = value * 10 + d as i64;
            if value > i32::MAX as i64 + 1 {
                return Err(ChannelError::ConstantOverflow {
                    spec: self.text.to_string(),
                    offset: start,
                });
            }
            self.pos += 1;
        }

        let value = if negative { -value } else { value };
        i32::try_from(value).map_err(|_| ChannelError::ConstantOverflow {
            spec: self.text.to_string(),
            offset: start,
        })
    }

    fn digit_at(&self, pos: usize) -> Option<u8> {
        self.bytes
            .get(pos)
            .filter(|b| b.is_ascii_digit())
            .map(|b| b - b'0')
    }

    fn syntax(&self, offset: usize) -> ChannelError {
        ChannelError::Syntax {
            spec: self.text.to_string(),
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(text: &str) -> Vec<ChannelOp> {
        match ChannelSpec::parse(text).unwrap() {
            ChannelSpec::Ops(ops) => ops,
            ChannelSpec::Auto => panic!("unexpected auto"),
        }
    }

    #[test]
    fn test_parse_selects() {
        assert_eq!(
            ops("102"),
            vec![
                ChannelOp::select(1, 0),
                ChannelOp::select(0, 1),
                ChannelOp::select(2, 2)
            ]
        );
    }

    #[test]
    fn test_parse_arithmetic() {
        assert_eq!(ops("+01"), vec![ChannelOp::new(OpKind::Add(0, 1), 0)]);
        assert_eq!(ops("-10"), vec![ChannelOp::new(OpKind::Subtract(1, 0), 0)]);
        assert_eq!(
            ops("+0d1000,-1d25"),
            vec![
                ChannelOp::new(OpKind::AddConstant(0, 1000), 0),
                ChannelOp::new(OpKind::SubtractConstant(1, 25), 1)
            ]
        );
    }

    #[test]
    fn test_parse_constants() {
        assert_eq!(
            ops("d42,d-7,d+3,z"),
            vec![
                ChannelOp::new(OpKind::Constant(42), 0),
                ChannelOp::new(OpKind::Constant(-7), 1),
                ChannelOp::new(OpKind::Constant(3), 2),
                ChannelOp::new(OpKind::Constant(0), 3)
            ]
        );
    }

    #[test]
    fn test_separators_do_not_produce_channels() {
        assert_eq!(ops(",0,,1,"), ops("01"));
        assert!(ops("").is_empty());
    }

    #[test]
    fn test_syntax_errors() {
        for (text, offset) in [("x", 0), ("0x", 1), ("+0", 2), ("+x1", 1), ("-0d", 2), ("d", 1), ("d-", 2)] {
            match ChannelSpec::parse(text) {
                Err(ChannelError::Syntax { offset: at, .. }) => assert_eq!(at, offset, "{}", text),
                other => panic!("{:?} parsed as {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_constant_overflow() {
        assert!(matches!(
            ChannelSpec::parse("d99999999999"),
            Err(ChannelError::ConstantOverflow { .. })
        ));
        assert_eq!(ops("d-2147483648"), vec![ChannelOp::new(OpKind::Constant(i32::MIN), 0)]);
        assert!(ChannelSpec::parse("d2147483648").is_err());
    }

    #[test]
    fn test_truncates_after_max_ops() {
        let text = "0".repeat(MAX_CHANNEL_OPS + 4) + "q";
        let parsed = ops(&text);
        assert_eq!(parsed.len(), MAX_CHANNEL_OPS);
        assert_eq!(parsed.last().unwrap().dst as usize, MAX_CHANNEL_OPS - 1);
    }

    #[test]
    fn test_auto_round_robin() {
        let plan = parse_spec("auto", 2, 5).unwrap();
        assert_eq!(plan.output_channels(), 5);
        for (i, op) in plan.ops().iter().enumerate() {
            assert_eq!(op.kind, OpKind::Select((i % 2) as u8));
            assert_eq!(op.dst as usize, i);
        }

        let plan = parse_spec("auto", 3, 0).unwrap();
        assert_eq!(plan.output_channels(), 3);
        assert!(plan.is_identity());
    }

    #[test]
    fn test_source_out_of_range() {
        assert_eq!(
            parse_spec("02", 2, 0),
            Err(ChannelError::SourceOutOfRange { index: 2, channels: 2 })
        );
        assert_eq!(parse_spec("auto", 0, 2), Err(ChannelError::NoSourceChannels));
        assert!(matches!(
            parse_spec("01", 2, 17),
            Err(ChannelError::TooManyOutputs(17))
        ));
    }
}
