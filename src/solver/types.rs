use std::fmt::Display;
use std::ops::{BitAnd, BitXor, Not, Shr};

use ordered_float::OrderedFloat;

/// Representations for decision levels etc. so I'm consistent
pub type DecisionLevel = u32;

/// Let us use f64s as Ord
pub type F64 = OrderedFloat<f64>;

/// Representation of a variable: a dense non-negative index
pub type Var = i32;
// Since we won't have any negative variables
pub const V_UNDEF: Var = -1;

/// Representation of a Literal, using the MiniSat convention: lit.v = 2 * var + sign
#[derive(Hash, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lit {
    pub v: i32,
}

// Custom markers for Lits; since we scale the literals up, and thus use no negatives, there
// should be no conflicts here.
pub const L_UNDEF: Lit = Lit { v: -2 };

impl Lit {
    // Here, a TRUE sign == NEGATIVE
    pub fn new(v: Var, sign: bool) -> Lit {
        Lit {
            v: v + v + (sign as i32),
        }
    }

    // Returns true if sign is negative.
    pub fn sign(&self) -> bool {
        self.v.bitand(1) != 0
    }

    pub fn var(&self) -> Var {
        self.v.shr(1)
    }

    // Variable, but cast as usize to index
    pub fn var_idx(&self) -> usize {
        self.v.shr(1) as usize
    }

    // Get v as an index
    #[inline(always)]
    pub fn idx(&self) -> usize {
        self.v as usize
    }
}

impl Not for Lit {
    type Output = Self;
    fn not(self) -> Lit {
        Self {
            v: self.v.bitxor(1),
        }
    }
}

/// `lit ^ true` negates, `lit ^ false` is the identity. Folds a sign with a boolean
/// predicate without a branch.
impl BitXor<bool> for Lit {
    type Output = Self;
    fn bitxor(self, rhs: bool) -> Lit {
        Self {
            v: self.v.bitxor(rhs as i32),
        }
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", if self.sign() { "-" } else { "" }, self.var() + 1)
    }
}

// Represent true, false, or UNDEF (i.e. not yet assigned). We prefer this over an Option<bool>,
// since we only really have 3 values (i.e. u8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LBool {
    True = 0,
    False = 1,
    Undef = 2,
}

impl LBool {
    pub fn from_sign(s: bool) -> LBool {
        LBool::from(!s as u8)
    }

    /// True iff this is the definite value `b` (Undef matches neither).
    pub fn val_is(self, b: bool) -> bool {
        self == LBool::from_sign(b)
    }

    pub fn is_not_undef(self) -> bool {
        self != LBool::Undef
    }
}

impl From<LBool> for bool {
    #[inline(always)]
    fn from(value: LBool) -> Self {
        matches!(value, LBool::True)
    }
}

impl From<u8> for LBool {
    #[inline(always)]
    fn from(value: u8) -> Self {
        match value {
            0 => Self::True,
            1 => Self::False,
            _ => Self::Undef,
        }
    }
}

impl Default for LBool {
    fn default() -> Self {
        Self::Undef
    }
}

impl BitXor for LBool {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> LBool {
        LBool::from((self as u8).bitxor(rhs as u8))
    }
}

/// `v ^ true` flips True/False and leaves Undef alone.
impl BitXor<bool> for LBool {
    type Output = Self;
    fn bitxor(self, rhs: bool) -> LBool {
        LBool::from((self as u8).bitxor(rhs as u8))
    }
}

// Status markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Unknown,
    Sat,
    Unsat,
}

impl Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Unknown => write!(f, "UNKNOWN"),
            SolveStatus::Sat => write!(f, "SATISFIABLE"),
            SolveStatus::Unsat => write!(f, "UNSATISFIABLE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_encoding() {
        let p = Lit::new(3, false);
        let n = Lit::new(3, true);
        assert_eq!(p.var(), 3);
        assert_eq!(n.var(), 3);
        assert!(!p.sign());
        assert!(n.sign());
        assert_eq!(!p, n);
        assert_eq!(!!p, p);
    }

    #[test]
    fn lit_xor_folds_sign() {
        let p = Lit::new(5, false);
        assert_eq!(p ^ false, p);
        assert_eq!(p ^ true, !p);
    }

    #[test]
    fn lbool_xor() {
        assert_eq!(LBool::True ^ LBool::False, LBool::False);
        assert_eq!(LBool::True ^ true, LBool::False);
        assert_eq!(LBool::False ^ true, LBool::True);
        assert_eq!(LBool::Undef ^ true, LBool::Undef);
    }

    #[test]
    fn lbool_val_is() {
        assert!(LBool::True.val_is(true));
        assert!(LBool::False.val_is(false));
        assert!(!LBool::Undef.val_is(true));
        assert!(!LBool::Undef.val_is(false));
    }
}
