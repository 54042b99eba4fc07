use std::cmp::Ordering;
use std::fmt;

use crate::tuple::{Tuple, Value};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    /// Substring match on strings; equality otherwise
    Like,
    NotEquals,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::GreaterThanOrEq => ">=",
            Op::Like => "LIKE",
            Op::NotEquals => "<>",
        };
        write!(f, "{}", s)
    }
}

/// Compares one column of a tuple against a constant.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: Op,
    operand: Value,
}

impl Predicate {
    pub fn new(field: usize, op: Op, operand: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            operand: operand.into(),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// True when the tuple's field satisfies the comparison. NULLs, missing
    /// fields and incomparable types never match.
    pub fn filter(&self, tuple: &Tuple) -> bool {
        let value = match tuple.value(self.field) {
            Some(v) if !v.is_null() && !self.operand.is_null() => v,
            _ => return false,
        };

        if let (Op::Like, Value::String(s), Value::String(pattern)) = (self.op, value, &self.operand)
        {
            return s.contains(pattern.as_str());
        }

        let Some(ordering) = value.compare(&self.operand) else {
            return false;
        };

        match self.op {
            Op::Equals | Op::Like => ordering == Ordering::Equal,
            Op::NotEquals => ordering != Ordering::Equal,
            Op::GreaterThan => ordering == Ordering::Greater,
            Op::LessThan => ordering == Ordering::Less,
            Op::LessThanOrEq => ordering != Ordering::Greater,
            Op::GreaterThanOrEq => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {}", self.field, self.op, self.operand)
    }
}
