use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Column, DataType, Schema, Tuple, Value};

use super::{Operator, TupleIterator};

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    /// Integer division of the sum by the count
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{}", s)
    }
}

/// Running state of one group
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    min: i64,
    max: i64,
    sum: i64,
    count: i64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            min: i64::MAX,
            max: i64::MIN,
            sum: 0,
            count: 0,
        }
    }

    fn add(&mut self, value: Option<i64>) {
        self.count += 1;
        if let Some(v) = value {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
            self.sum = self.sum.wrapping_add(v);
        }
    }

    fn result(&self, op: AggregateOp) -> Value {
        if self.count == 0 {
            return Value::Null;
        }
        let v = match op {
            AggregateOp::Min => self.min,
            AggregateOp::Max => self.max,
            AggregateOp::Sum => self.sum,
            AggregateOp::Avg => self.sum / self.count,
            AggregateOp::Count => self.count,
        };
        Value::BigInt(v)
    }
}

/// Computes one aggregate over a column of its child, optionally grouped
/// by another column.
///
/// Output records are `(group, aggregate)` or just `(aggregate)`. The
/// aggregate column is a `BIGINT` named like `sum(price)`. Groups come out
/// in the order they were first seen. NULL aggregate inputs are skipped.
pub struct Aggregate {
    child: Box<dyn Operator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    schema: Arc<Schema>,
    results: Option<TupleIterator>,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn Operator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let child_schema = child.schema();
        let agg_col = child_schema.column(agg_field).ok_or_else(|| {
            DbError::UnsupportedAggregate(format!("no column #{}", agg_field))
        })?;

        if !agg_col.data_type().is_integral() && op != AggregateOp::Count {
            return Err(DbError::UnsupportedAggregate(format!(
                "{} over {} column '{}'",
                op,
                agg_col.data_type(),
                agg_col.name()
            )));
        }

        let agg_out = Column::new(
            format!("{}({})", op, agg_col.name()),
            DataType::BigInt,
            true,
        );

        let columns = match group_field {
            Some(g) => {
                let group_col = child_schema.column(g).ok_or_else(|| {
                    DbError::UnsupportedAggregate(format!("no group column #{}", g))
                })?;
                vec![group_col.clone(), agg_out]
            }
            None => vec![agg_out],
        };

        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            schema: Arc::new(Schema::new(columns)),
            results: None,
        })
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn agg_field(&self) -> usize {
        self.agg_field
    }

    fn compute(&mut self) -> Result<Vec<Tuple>> {
        // Value is not hashable, so groups are found by linear search
        let mut groups: Vec<(Value, Accumulator)> = Vec::new();

        while let Some(tuple) = self.child.next()? {
            let agg_value = tuple.value(self.agg_field).cloned().unwrap_or(Value::Null);
            if agg_value.is_null() {
                continue;
            }
            let key = match self.group_field {
                Some(g) => tuple.value(g).cloned().unwrap_or(Value::Null),
                None => Value::Null,
            };

            let idx = match groups.iter().position(|(k, _)| *k == key) {
                Some(idx) => idx,
                None => {
                    groups.push((key, Accumulator::new()));
                    groups.len() - 1
                }
            };
            groups[idx].1.add(agg_value.as_i64());
        }

        if groups.is_empty() && self.group_field.is_none() {
            groups.push((Value::Null, Accumulator::new()));
        }

        let tuples = groups
            .into_iter()
            .map(|(key, acc)| {
                let result = acc.result(self.op);
                let values = match self.group_field {
                    Some(_) => vec![key, result],
                    None => vec![result],
                };
                Tuple::new(Arc::clone(&self.schema), values)
            })
            .collect();
        Ok(tuples)
    }
}

impl Operator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        let tuples = self.compute()?;
        let mut results = TupleIterator::new(Arc::clone(&self.schema), tuples);
        results.open()?;
        self.results = Some(results);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        self.results
            .as_mut()
            .ok_or(DbError::OperatorNotOpen)?
            .next()
    }

    fn rewind(&mut self) -> Result<()> {
        self.results
            .as_mut()
            .ok_or(DbError::OperatorNotOpen)?
            .rewind()
    }

    fn close(&mut self) {
        self.results = None;
        self.child.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
