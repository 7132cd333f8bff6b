use std::cmp::Ordering;

/// Five-valued comparator result used throughout the RDX comparator vtable
/// (spec §4.5). `LEq`/`GrEq` let a tie-breaker distinguish "equal key,
/// smaller value" from "equal in every respect"; most callers only care
/// whether the result is `< Eq`, `== Eq`, or `> Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum Order {
    Less = -2,
    LEq = -1,
    Eq = 0,
    GrEq = 1,
    Grtr = 2,
}

impl Order {
    pub const fn is_lt(self) -> bool {
        (self as i8) < 0
    }

    pub const fn is_gt(self) -> bool {
        (self as i8) > 0
    }

    pub const fn is_eq(self) -> bool {
        matches!(self, Order::Eq)
    }

    /// Collapses `LEq`/`GrEq` down to `Less`/`Grtr`, as most call sites want.
    pub const fn coarsen(self) -> Order {
        match self {
            Order::LEq => Order::Less,
            Order::GrEq => Order::Grtr,
            other => other,
        }
    }
}

impl From<Ordering> for Order {
    fn from(o: Ordering) -> Self {
        match o {
            Ordering::Less => Order::Less,
            Ordering::Equal => Order::Eq,
            Ordering::Greater => Order::Grtr,
        }
    }
}

impl From<Order> for Ordering {
    fn from(o: Order) -> Self {
        match o {
            Order::Less | Order::LEq => Ordering::Less,
            Order::Eq => Ordering::Equal,
            Order::GrEq | Order::Grtr => Ordering::Greater,
        }
    }
}
