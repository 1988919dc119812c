// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Runtime numeric values.
//!
//! Every numeric kind is a distinct runtime type; operands of a binary
//! operation always have the same kind (the checker guarantees this, and the
//! runtime re-verifies). Widths up to 256 bits check overflow and underflow,
//! `Word*` kinds wrap, `Int`/`UInt` are exact, and the fixed-point kinds
//! operate on raw values scaled by 10^8. Saturating variants clamp to the
//! kind's bounds instead of raising; division still raises on a zero
//! divisor.

use core::cmp::Ordering;
use core::fmt;

use alloy_primitives::{I256, U256};
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use tessera_core::{ErrorKind, MemoryUsage, RuntimeError};

use crate::types::NumberKind;

/// The scale factor of `Fix64` and `UFix64`.
pub const FIXED_POINT_SCALE: i128 = 100_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NumberValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Int256(I256),
    Int(BigInt),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    UInt256(U256),
    UInt(BigInt),
    Word8(u8),
    Word16(u16),
    Word32(u32),
    Word64(u64),
    Word128(u128),
    Word256(U256),
    /// Raw value scaled by 10^8.
    Fix64(i64),
    /// Raw value scaled by 10^8.
    UFix64(u64),
}

/// Which bound an overflowing operation ran past.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bound {
    Max,
    Min,
}

impl Bound {
    fn error(self) -> RuntimeError {
        match self {
            Bound::Max => ErrorKind::Overflow.into(),
            Bound::Min => ErrorKind::Underflow.into(),
        }
    }
}

fn mismatch(op: &str, a: &NumberValue, b: &NumberValue) -> RuntimeError {
    ErrorKind::Unexpected {
        message: format!("invalid {op} of {} and {}", a.kind(), b.kind()),
    }
    .into()
}

fn unsupported(op: &str, a: &NumberValue) -> RuntimeError {
    ErrorKind::Unexpected {
        message: format!("{} does not support {op}", a.kind()),
    }
    .into()
}

/// The bound exceeded when `a + b` does not fit.
fn add_bound(_a: &NumberValue, _b: &NumberValue, b_sign: i8) -> Bound {
    if b_sign >= 0 {
        Bound::Max
    } else {
        Bound::Min
    }
}

/// The bound exceeded when `a - b` does not fit.
fn subtract_bound(_a: &NumberValue, _b: &NumberValue, b_sign: i8) -> Bound {
    if b_sign <= 0 {
        Bound::Max
    } else {
        Bound::Min
    }
}

/// The bound exceeded when `a * b` does not fit, by operand signs.
fn multiply_bound(a: &NumberValue, b: &NumberValue, _b_sign: i8) -> Bound {
    if a.sign() * b.sign() >= 0 {
        Bound::Max
    } else {
        Bound::Min
    }
}

/// Division only overflows at `MIN / -1` for signed kinds.
fn divide_bound(_a: &NumberValue, _b: &NumberValue, _b_sign: i8) -> Bound {
    Bound::Max
}

/// Generates a checked binary operation over every numeric kind. `$checked`
/// is the primitive checked method, `$op` the exact big-integer operator,
/// `$fix64`/`$ufix64` the fixed-point helpers, and `$bound` decides between
/// overflow and underflow when a checked step fails.
macro_rules! impl_checked_binary {
    ($vis:vis $name:ident, $opname:literal, $checked:ident, $op:tt, $fix64:ident, $ufix64:ident, $bound:ident) => {
        $vis fn $name(&self, other: &NumberValue) -> Result<NumberValue, RuntimeError> {
            use NumberValue::*;
            let fail = || $bound(self, other, other.sign()).error();
            match (self, other) {
                (Int8(a), Int8(b)) => a.$checked(*b).map(Int8).ok_or_else(fail),
                (Int16(a), Int16(b)) => a.$checked(*b).map(Int16).ok_or_else(fail),
                (Int32(a), Int32(b)) => a.$checked(*b).map(Int32).ok_or_else(fail),
                (Int64(a), Int64(b)) => a.$checked(*b).map(Int64).ok_or_else(fail),
                (Int128(a), Int128(b)) => a.$checked(*b).map(Int128).ok_or_else(fail),
                (Int256(a), Int256(b)) => a.$checked(*b).map(Int256).ok_or_else(fail),
                (Int(a), Int(b)) => Ok(Int(a $op b)),
                (UInt8(a), UInt8(b)) => a.$checked(*b).map(UInt8).ok_or_else(fail),
                (UInt16(a), UInt16(b)) => a.$checked(*b).map(UInt16).ok_or_else(fail),
                (UInt32(a), UInt32(b)) => a.$checked(*b).map(UInt32).ok_or_else(fail),
                (UInt64(a), UInt64(b)) => a.$checked(*b).map(UInt64).ok_or_else(fail),
                (UInt128(a), UInt128(b)) => a.$checked(*b).map(UInt128).ok_or_else(fail),
                (UInt256(a), UInt256(b)) => a.$checked(*b).map(UInt256).ok_or_else(fail),
                (UInt(a), UInt(b)) => {
                    let result = a $op b;
                    if result.sign() == Sign::Minus {
                        Err(ErrorKind::Underflow.into())
                    } else {
                        Ok(UInt(result))
                    }
                }
                (Word8(a), Word8(b)) => Ok(Word8(word_op!(a, b, $checked, $op))),
                (Word16(a), Word16(b)) => Ok(Word16(word_op!(a, b, $checked, $op))),
                (Word32(a), Word32(b)) => Ok(Word32(word_op!(a, b, $checked, $op))),
                (Word64(a), Word64(b)) => Ok(Word64(word_op!(a, b, $checked, $op))),
                (Word128(a), Word128(b)) => Ok(Word128(word_op!(a, b, $checked, $op))),
                (Word256(a), Word256(b)) => Ok(Word256(word_op!(a, b, $checked, $op))),
                (Fix64(a), Fix64(b)) => $fix64(*a, *b).map(Fix64),
                (UFix64(a), UFix64(b)) => $ufix64(*a, *b).map(UFix64),
                (a, b) => Err(mismatch($opname, a, b)),
            }
        }
    };
}

/// Word kinds wrap: apply the checked step and fall back to the wrapping
/// result on the rare failing cases (`MIN / -1` cannot occur unsigned, so
/// the fallback only ever fires for add/sub/mul).
macro_rules! word_op {
    ($a:ident, $b:ident, checked_div, $op:tt) => {
        // Divisor is non-zero by the caller's guard.
        *$a $op *$b
    };
    ($a:ident, $b:ident, checked_rem, $op:tt) => {
        *$a $op *$b
    };
    ($a:ident, $b:ident, $checked:ident, $op:tt) => {
        wrapping_counterpart!($a, $b, $checked)
    };
}

/// Maps a checked method name to its wrapping counterpart for the word arms.
macro_rules! wrapping_counterpart {
    ($a:ident, $b:ident, checked_add) => {
        $a.wrapping_add(*$b)
    };
    ($a:ident, $b:ident, checked_sub) => {
        $a.wrapping_sub(*$b)
    };
    ($a:ident, $b:ident, checked_mul) => {
        $a.wrapping_mul(*$b)
    };
}

/// A single saturating match arm: run the checked step and clamp to the
/// violated bound on failure.
macro_rules! clamp_arm {
    ($a:ident, $b:ident, $variant:ident, $ty:ty, $checked:ident, $bound_expr:expr) => {
        Ok(NumberValue::$variant($a.$checked(*$b).unwrap_or_else(|| {
            match $bound_expr {
                Bound::Max => <$ty>::MAX,
                Bound::Min => <$ty>::MIN,
            }
        })))
    };
}

/// Generates a saturating binary operation over the bounded kinds. The
/// arbitrary-precision kinds stay exact (`UInt` clamps at zero); word kinds
/// have no saturating arithmetic.
macro_rules! impl_saturating_binary {
    ($name:ident, $opname:literal, $checked:ident, $op:tt, $fix64:ident, $ufix64:ident, $bound:ident) => {
        pub fn $name(&self, other: &NumberValue) -> Result<NumberValue, RuntimeError> {
            use NumberValue::*;
            match (self, other) {
                (Int8(a), Int8(b)) => clamp_arm!(a, b, Int8, i8, $checked, $bound(self, other, other.sign())),
                (Int16(a), Int16(b)) => clamp_arm!(a, b, Int16, i16, $checked, $bound(self, other, other.sign())),
                (Int32(a), Int32(b)) => clamp_arm!(a, b, Int32, i32, $checked, $bound(self, other, other.sign())),
                (Int64(a), Int64(b)) => clamp_arm!(a, b, Int64, i64, $checked, $bound(self, other, other.sign())),
                (Int128(a), Int128(b)) => clamp_arm!(a, b, Int128, i128, $checked, $bound(self, other, other.sign())),
                (Int256(a), Int256(b)) => clamp_arm!(a, b, Int256, I256, $checked, $bound(self, other, other.sign())),
                (Int(a), Int(b)) => Ok(Int(a $op b)),
                (UInt8(a), UInt8(b)) => clamp_arm!(a, b, UInt8, u8, $checked, $bound(self, other, other.sign())),
                (UInt16(a), UInt16(b)) => clamp_arm!(a, b, UInt16, u16, $checked, $bound(self, other, other.sign())),
                (UInt32(a), UInt32(b)) => clamp_arm!(a, b, UInt32, u32, $checked, $bound(self, other, other.sign())),
                (UInt64(a), UInt64(b)) => clamp_arm!(a, b, UInt64, u64, $checked, $bound(self, other, other.sign())),
                (UInt128(a), UInt128(b)) => clamp_arm!(a, b, UInt128, u128, $checked, $bound(self, other, other.sign())),
                (UInt256(a), UInt256(b)) => clamp_arm!(a, b, UInt256, U256, $checked, $bound(self, other, other.sign())),
                (UInt(a), UInt(b)) => {
                    let result = a $op b;
                    if result.sign() == Sign::Minus {
                        Ok(UInt(BigInt::zero()))
                    } else {
                        Ok(UInt(result))
                    }
                }
                (Fix64(a), Fix64(b)) => Ok(Fix64(match $fix64(*a, *b) {
                    Ok(raw) => raw,
                    Err(error) if error.kind == ErrorKind::DivisionByZero => return Err(error),
                    Err(error) => match error.kind {
                        ErrorKind::Underflow => i64::MIN,
                        _ => i64::MAX,
                    },
                })),
                (UFix64(a), UFix64(b)) => Ok(UFix64(match $ufix64(*a, *b) {
                    Ok(raw) => raw,
                    Err(error) if error.kind == ErrorKind::DivisionByZero => return Err(error),
                    Err(error) => match error.kind {
                        ErrorKind::Underflow => u64::MIN,
                        _ => u64::MAX,
                    },
                })),
                (a @ (Word8(_) | Word16(_) | Word32(_) | Word64(_) | Word128(_) | Word256(_)), _) => {
                    Err(unsupported(concat!("saturating ", $opname), a))
                }
                (a, b) => Err(mismatch($opname, a, b)),
            }
        }
    };
}

/// Generates a bitwise binary operation over the integer kinds.
macro_rules! impl_bitwise_binary {
    ($name:ident, $opname:literal, $op:tt) => {
        pub fn $name(&self, other: &NumberValue) -> Result<NumberValue, RuntimeError> {
            use NumberValue::*;
            match (self, other) {
                (Int8(a), Int8(b)) => Ok(Int8(a $op b)),
                (Int16(a), Int16(b)) => Ok(Int16(a $op b)),
                (Int32(a), Int32(b)) => Ok(Int32(a $op b)),
                (Int64(a), Int64(b)) => Ok(Int64(a $op b)),
                (Int128(a), Int128(b)) => Ok(Int128(a $op b)),
                (Int256(a), Int256(b)) => Ok(Int256(*a $op *b)),
                (Int(a), Int(b)) => Ok(Int(a $op b)),
                (UInt8(a), UInt8(b)) => Ok(UInt8(a $op b)),
                (UInt16(a), UInt16(b)) => Ok(UInt16(a $op b)),
                (UInt32(a), UInt32(b)) => Ok(UInt32(a $op b)),
                (UInt64(a), UInt64(b)) => Ok(UInt64(a $op b)),
                (UInt128(a), UInt128(b)) => Ok(UInt128(a $op b)),
                (UInt256(a), UInt256(b)) => Ok(UInt256(*a $op *b)),
                (UInt(a), UInt(b)) => Ok(UInt(a $op b)),
                (Word8(a), Word8(b)) => Ok(Word8(a $op b)),
                (Word16(a), Word16(b)) => Ok(Word16(a $op b)),
                (Word32(a), Word32(b)) => Ok(Word32(a $op b)),
                (Word64(a), Word64(b)) => Ok(Word64(a $op b)),
                (Word128(a), Word128(b)) => Ok(Word128(a $op b)),
                (Word256(a), Word256(b)) => Ok(Word256(*a $op *b)),
                (a @ (Fix64(_) | UFix64(_)), _) => Err(unsupported($opname, a)),
                (a, b) => Err(mismatch($opname, a, b)),
            }
        }
    };
}

fn fix64_add(a: i64, b: i64) -> Result<i64, RuntimeError> {
    a.checked_add(b).ok_or_else(|| {
        if b >= 0 {
            Bound::Max.error()
        } else {
            Bound::Min.error()
        }
    })
}

fn fix64_subtract(a: i64, b: i64) -> Result<i64, RuntimeError> {
    a.checked_sub(b).ok_or_else(|| {
        if b <= 0 {
            Bound::Max.error()
        } else {
            Bound::Min.error()
        }
    })
}

fn fix64_multiply(a: i64, b: i64) -> Result<i64, RuntimeError> {
    let wide = (a as i128) * (b as i128) / FIXED_POINT_SCALE;
    i64::try_from(wide).map_err(|_| {
        if (a < 0) == (b < 0) {
            Bound::Max.error()
        } else {
            Bound::Min.error()
        }
    })
}

fn fix64_divide(a: i64, b: i64) -> Result<i64, RuntimeError> {
    // Divisor is non-zero by the caller's guard.
    let wide = (a as i128) * FIXED_POINT_SCALE / (b as i128);
    i64::try_from(wide).map_err(|_| {
        if (a < 0) == (b < 0) {
            Bound::Max.error()
        } else {
            Bound::Min.error()
        }
    })
}

fn fix64_remainder(a: i64, b: i64) -> Result<i64, RuntimeError> {
    Ok(a.wrapping_rem(b))
}

fn ufix64_add(a: u64, b: u64) -> Result<u64, RuntimeError> {
    a.checked_add(b).ok_or_else(|| Bound::Max.error())
}

fn ufix64_subtract(a: u64, b: u64) -> Result<u64, RuntimeError> {
    a.checked_sub(b).ok_or_else(|| Bound::Min.error())
}

fn ufix64_multiply(a: u64, b: u64) -> Result<u64, RuntimeError> {
    let wide = (a as u128) * (b as u128) / (FIXED_POINT_SCALE as u128);
    u64::try_from(wide).map_err(|_| Bound::Max.error())
}

fn ufix64_divide(a: u64, b: u64) -> Result<u64, RuntimeError> {
    let wide = (a as u128) * (FIXED_POINT_SCALE as u128) / (b as u128);
    u64::try_from(wide).map_err(|_| Bound::Max.error())
}

fn ufix64_remainder(a: u64, b: u64) -> Result<u64, RuntimeError> {
    Ok(a % b)
}

impl NumberValue {
    pub fn kind(&self) -> NumberKind {
        match self {
            NumberValue::Int8(_) => NumberKind::Int8,
            NumberValue::Int16(_) => NumberKind::Int16,
            NumberValue::Int32(_) => NumberKind::Int32,
            NumberValue::Int64(_) => NumberKind::Int64,
            NumberValue::Int128(_) => NumberKind::Int128,
            NumberValue::Int256(_) => NumberKind::Int256,
            NumberValue::Int(_) => NumberKind::Int,
            NumberValue::UInt8(_) => NumberKind::UInt8,
            NumberValue::UInt16(_) => NumberKind::UInt16,
            NumberValue::UInt32(_) => NumberKind::UInt32,
            NumberValue::UInt64(_) => NumberKind::UInt64,
            NumberValue::UInt128(_) => NumberKind::UInt128,
            NumberValue::UInt256(_) => NumberKind::UInt256,
            NumberValue::UInt(_) => NumberKind::UInt,
            NumberValue::Word8(_) => NumberKind::Word8,
            NumberValue::Word16(_) => NumberKind::Word16,
            NumberValue::Word32(_) => NumberKind::Word32,
            NumberValue::Word64(_) => NumberKind::Word64,
            NumberValue::Word128(_) => NumberKind::Word128,
            NumberValue::Word256(_) => NumberKind::Word256,
            NumberValue::Fix64(_) => NumberKind::Fix64,
            NumberValue::UFix64(_) => NumberKind::UFix64,
        }
    }

    /// The typed memory usage of this value's representation.
    pub fn memory_usage(&self) -> MemoryUsage {
        match self {
            NumberValue::Int(v) | NumberValue::UInt(v) => {
                MemoryUsage::big_int((v.bits() / 8 + 1).max(1))
            }
            other => MemoryUsage::number(
                other
                    .kind()
                    .byte_width()
                    .expect("fixed-width kinds have a byte width"),
            ),
        }
    }

    pub fn is_zero(&self) -> bool {
        use NumberValue::*;
        match self {
            Int8(v) => *v == 0,
            Int16(v) => *v == 0,
            Int32(v) => *v == 0,
            Int64(v) | Fix64(v) => *v == 0,
            Int128(v) => *v == 0,
            Int256(v) => v.is_zero(),
            Int(v) | UInt(v) => v.is_zero(),
            UInt8(v) | Word8(v) => *v == 0,
            UInt16(v) | Word16(v) => *v == 0,
            UInt32(v) | Word32(v) => *v == 0,
            UInt64(v) | Word64(v) | UFix64(v) => *v == 0,
            UInt128(v) | Word128(v) => *v == 0,
            UInt256(v) | Word256(v) => v.is_zero(),
        }
    }

    fn sign(&self) -> i8 {
        use NumberValue::*;
        match self {
            Int8(v) => v.signum(),
            Int16(v) => v.signum() as i8,
            Int32(v) => v.signum() as i8,
            Int64(v) | Fix64(v) => v.signum() as i8,
            Int128(v) => v.signum() as i8,
            Int256(v) => {
                if v.is_zero() {
                    0
                } else if v.is_negative() {
                    -1
                } else {
                    1
                }
            }
            Int(v) | UInt(v) => match v.sign() {
                Sign::Minus => -1,
                Sign::NoSign => 0,
                Sign::Plus => 1,
            },
            other => {
                if other.is_zero() {
                    0
                } else {
                    1
                }
            }
        }
    }

    impl_checked_binary!(pub checked_add, "addition", checked_add, +, fix64_add, ufix64_add, add_bound);
    impl_checked_binary!(pub checked_subtract, "subtraction", checked_sub, -, fix64_subtract, ufix64_subtract, subtract_bound);
    impl_checked_binary!(pub checked_multiply, "multiplication", checked_mul, *, fix64_multiply, ufix64_multiply, multiply_bound);

    pub fn checked_divide(&self, other: &NumberValue) -> Result<NumberValue, RuntimeError> {
        if other.is_zero() {
            return Err(ErrorKind::DivisionByZero.into());
        }
        self.divide_nonzero(other)
    }

    impl_checked_binary!(divide_nonzero, "division", checked_div, /, fix64_divide, ufix64_divide, divide_bound);

    pub fn checked_remainder(&self, other: &NumberValue) -> Result<NumberValue, RuntimeError> {
        if other.is_zero() {
            return Err(ErrorKind::DivisionByZero.into());
        }
        use NumberValue::*;
        // `MIN % -1` is 0 mathematically; route the signed kinds through
        // wrapping_rem, which produces exactly that.
        match (self, other) {
            (Int8(a), Int8(b)) => Ok(Int8(a.wrapping_rem(*b))),
            (Int16(a), Int16(b)) => Ok(Int16(a.wrapping_rem(*b))),
            (Int32(a), Int32(b)) => Ok(Int32(a.wrapping_rem(*b))),
            (Int64(a), Int64(b)) => Ok(Int64(a.wrapping_rem(*b))),
            (Int128(a), Int128(b)) => Ok(Int128(a.wrapping_rem(*b))),
            (Int256(a), Int256(b)) => {
                if *b == I256::MINUS_ONE {
                    Ok(Int256(I256::ZERO))
                } else {
                    Ok(Int256(*a % *b))
                }
            }
            (Int(a), Int(b)) => Ok(Int(a % b)),
            (UInt(a), UInt(b)) => Ok(UInt(a % b)),
            (UInt8(a), UInt8(b)) => Ok(UInt8(a % b)),
            (UInt16(a), UInt16(b)) => Ok(UInt16(a % b)),
            (UInt32(a), UInt32(b)) => Ok(UInt32(a % b)),
            (UInt64(a), UInt64(b)) => Ok(UInt64(a % b)),
            (UInt128(a), UInt128(b)) => Ok(UInt128(a % b)),
            (UInt256(a), UInt256(b)) => Ok(UInt256(*a % *b)),
            (Word8(a), Word8(b)) => Ok(Word8(a % b)),
            (Word16(a), Word16(b)) => Ok(Word16(a % b)),
            (Word32(a), Word32(b)) => Ok(Word32(a % b)),
            (Word64(a), Word64(b)) => Ok(Word64(a % b)),
            (Word128(a), Word128(b)) => Ok(Word128(a % b)),
            (Word256(a), Word256(b)) => Ok(Word256(*a % *b)),
            (Fix64(a), Fix64(b)) => fix64_remainder(*a, *b).map(Fix64),
            (UFix64(a), UFix64(b)) => ufix64_remainder(*a, *b).map(UFix64),
            (a, b) => Err(mismatch("remainder", a, b)),
        }
    }

    impl_saturating_binary!(saturating_add, "addition", checked_add, +, fix64_add, ufix64_add, add_bound);
    impl_saturating_binary!(saturating_subtract, "subtraction", checked_sub, -, fix64_subtract, ufix64_subtract, subtract_bound);
    impl_saturating_binary!(saturating_multiply, "multiplication", checked_mul, *, fix64_multiply, ufix64_multiply, multiply_bound);

    pub fn saturating_divide(&self, other: &NumberValue) -> Result<NumberValue, RuntimeError> {
        if other.is_zero() {
            return Err(ErrorKind::DivisionByZero.into());
        }
        // Division saturates only at `MIN / -1` for signed kinds.
        match self.divide_nonzero(other) {
            Ok(value) => Ok(value),
            Err(error) if error.kind == ErrorKind::Overflow => {
                use NumberValue::*;
                Ok(match self {
                    Int8(_) => Int8(i8::MAX),
                    Int16(_) => Int16(i16::MAX),
                    Int32(_) => Int32(i32::MAX),
                    Int64(_) => Int64(i64::MAX),
                    Int128(_) => Int128(i128::MAX),
                    Int256(_) => Int256(I256::MAX),
                    Fix64(_) => Fix64(i64::MAX),
                    _ => return Err(error),
                })
            }
            Err(error) => Err(error),
        }
    }

    impl_bitwise_binary!(bitwise_and, "bitwise and", &);
    impl_bitwise_binary!(bitwise_or, "bitwise or", |);
    impl_bitwise_binary!(bitwise_xor, "bitwise xor", ^);

    /// Left shift. Shifting by the bit width or more yields zero; the
    /// arbitrary-precision kinds shift exactly.
    pub fn shift_left(&self, other: &NumberValue) -> Result<NumberValue, RuntimeError> {
        let amount = other.shift_amount()?;
        use NumberValue::*;
        macro_rules! shl {
            ($a:ident, $variant:ident, $bits:expr) => {
                Ok($variant(if amount >= $bits { 0 } else { $a << amount }))
            };
        }
        match self {
            Int8(a) => shl!(a, Int8, 8),
            Int16(a) => shl!(a, Int16, 16),
            Int32(a) => shl!(a, Int32, 32),
            Int64(a) => shl!(a, Int64, 64),
            Int128(a) => shl!(a, Int128, 128),
            Int256(a) => Ok(Int256(*a << amount.min(256) as usize)),
            Int(a) => Ok(Int(a << amount as usize)),
            UInt8(a) => shl!(a, UInt8, 8),
            UInt16(a) => shl!(a, UInt16, 16),
            UInt32(a) => shl!(a, UInt32, 32),
            UInt64(a) => shl!(a, UInt64, 64),
            UInt128(a) => shl!(a, UInt128, 128),
            UInt256(a) => Ok(UInt256(*a << amount.min(256) as usize)),
            UInt(a) => Ok(UInt(a << amount as usize)),
            Word8(a) => shl!(a, Word8, 8),
            Word16(a) => shl!(a, Word16, 16),
            Word32(a) => shl!(a, Word32, 32),
            Word64(a) => shl!(a, Word64, 64),
            Word128(a) => shl!(a, Word128, 128),
            Word256(a) => Ok(Word256(*a << amount.min(256) as usize)),
            other @ (Fix64(_) | UFix64(_)) => Err(unsupported("shift", other)),
        }
    }

    /// Right shift. Arithmetic for signed kinds; shifting by the bit width
    /// or more yields the sign fill.
    pub fn shift_right(&self, other: &NumberValue) -> Result<NumberValue, RuntimeError> {
        let amount = other.shift_amount()?;
        use NumberValue::*;
        macro_rules! shr_signed {
            ($a:ident, $variant:ident, $bits:expr) => {
                Ok($variant(if amount >= $bits {
                    if *$a < 0 {
                        -1
                    } else {
                        0
                    }
                } else {
                    $a >> amount
                }))
            };
        }
        macro_rules! shr_unsigned {
            ($a:ident, $variant:ident, $bits:expr) => {
                Ok($variant(if amount >= $bits { 0 } else { $a >> amount }))
            };
        }
        match self {
            Int8(a) => shr_signed!(a, Int8, 8),
            Int16(a) => shr_signed!(a, Int16, 16),
            Int32(a) => shr_signed!(a, Int32, 32),
            Int64(a) => shr_signed!(a, Int64, 64),
            Int128(a) => shr_signed!(a, Int128, 128),
            Int256(a) => Ok(Int256(a.asr(amount.min(255) as usize))),
            Int(a) => Ok(Int(a >> amount as usize)),
            UInt8(a) => shr_unsigned!(a, UInt8, 8),
            UInt16(a) => shr_unsigned!(a, UInt16, 16),
            UInt32(a) => shr_unsigned!(a, UInt32, 32),
            UInt64(a) => shr_unsigned!(a, UInt64, 64),
            UInt128(a) => shr_unsigned!(a, UInt128, 128),
            UInt256(a) => Ok(UInt256(*a >> amount.min(256) as usize)),
            UInt(a) => Ok(UInt(a >> amount as usize)),
            Word8(a) => shr_unsigned!(a, Word8, 8),
            Word16(a) => shr_unsigned!(a, Word16, 16),
            Word32(a) => shr_unsigned!(a, Word32, 32),
            Word64(a) => shr_unsigned!(a, Word64, 64),
            Word128(a) => shr_unsigned!(a, Word128, 128),
            Word256(a) => Ok(Word256(*a >> amount.min(256) as usize)),
            other @ (Fix64(_) | UFix64(_)) => Err(unsupported("shift", other)),
        }
    }

    fn shift_amount(&self) -> Result<u32, RuntimeError> {
        if self.sign() < 0 {
            return Err(ErrorKind::Unexpected {
                message: "negative shift amount".into(),
            }
            .into());
        }
        // Amounts beyond u32 are indistinguishable from the bit width for
        // every representable kind.
        use NumberValue::*;
        Ok(match self {
            Int8(v) => *v as u32,
            Int16(v) => *v as u32,
            Int32(v) => *v as u32,
            Int64(v) | Fix64(v) => (*v).try_into().unwrap_or(u32::MAX),
            Int128(v) => (*v).try_into().unwrap_or(u32::MAX),
            Int256(v) => v.unsigned_abs().try_into().unwrap_or(u32::MAX),
            Int(v) | UInt(v) => v.to_u32().unwrap_or(u32::MAX),
            UInt8(v) | Word8(v) => *v as u32,
            UInt16(v) | Word16(v) => *v as u32,
            UInt32(v) | Word32(v) => *v,
            UInt64(v) | Word64(v) | UFix64(v) => (*v).try_into().unwrap_or(u32::MAX),
            UInt128(v) | Word128(v) => (*v).try_into().unwrap_or(u32::MAX),
            UInt256(v) | Word256(v) => (*v).try_into().unwrap_or(u32::MAX),
        })
    }

    pub fn checked_negate(&self) -> Result<NumberValue, RuntimeError> {
        use NumberValue::*;
        match self {
            Int8(a) => a.checked_neg().map(Int8).ok_or_else(|| Bound::Max.error()),
            Int16(a) => a.checked_neg().map(Int16).ok_or_else(|| Bound::Max.error()),
            Int32(a) => a.checked_neg().map(Int32).ok_or_else(|| Bound::Max.error()),
            Int64(a) => a.checked_neg().map(Int64).ok_or_else(|| Bound::Max.error()),
            Int128(a) => a.checked_neg().map(Int128).ok_or_else(|| Bound::Max.error()),
            Int256(a) => a.checked_neg().map(Int256).ok_or_else(|| Bound::Max.error()),
            Int(a) => Ok(Int(-a)),
            Fix64(a) => a.checked_neg().map(Fix64).ok_or_else(|| Bound::Max.error()),
            other => Err(unsupported("negation", other)),
        }
    }

    /// Same-kind ordering comparison.
    pub fn compare(&self, other: &NumberValue) -> Result<Ordering, RuntimeError> {
        use NumberValue::*;
        match (self, other) {
            (Int8(a), Int8(b)) => Ok(a.cmp(b)),
            (Int16(a), Int16(b)) => Ok(a.cmp(b)),
            (Int32(a), Int32(b)) => Ok(a.cmp(b)),
            (Int64(a), Int64(b)) | (Fix64(a), Fix64(b)) => Ok(a.cmp(b)),
            (Int128(a), Int128(b)) => Ok(a.cmp(b)),
            (Int256(a), Int256(b)) => Ok(a.cmp(b)),
            (Int(a), Int(b)) | (UInt(a), UInt(b)) => Ok(a.cmp(b)),
            (UInt8(a), UInt8(b)) | (Word8(a), Word8(b)) => Ok(a.cmp(b)),
            (UInt16(a), UInt16(b)) | (Word16(a), Word16(b)) => Ok(a.cmp(b)),
            (UInt32(a), UInt32(b)) | (Word32(a), Word32(b)) => Ok(a.cmp(b)),
            (UInt64(a), UInt64(b)) | (Word64(a), Word64(b)) | (UFix64(a), UFix64(b)) => {
                Ok(a.cmp(b))
            }
            (UInt128(a), UInt128(b)) | (Word128(a), Word128(b)) => Ok(a.cmp(b)),
            (UInt256(a), UInt256(b)) | (Word256(a), Word256(b)) => Ok(a.cmp(b)),
            (a, b) => Err(mismatch("comparison", a, b)),
        }
    }

    /// Constructs a value of `kind` from an exact integer, range-checking
    /// bounded kinds. Fixed-point kinds scale the integer up.
    pub fn from_bigint(kind: NumberKind, value: BigInt) -> Result<NumberValue, RuntimeError> {
        use NumberValue::*;
        let out_of_range = |value: &BigInt| {
            if value.sign() == Sign::Minus {
                Bound::Min.error()
            } else {
                Bound::Max.error()
            }
        };
        macro_rules! bounded {
            ($to:ident, $variant:ident) => {
                value.$to().map($variant).ok_or_else(|| out_of_range(&value))
            };
        }
        match kind {
            NumberKind::Int8 => bounded!(to_i8, Int8),
            NumberKind::Int16 => bounded!(to_i16, Int16),
            NumberKind::Int32 => bounded!(to_i32, Int32),
            NumberKind::Int64 => bounded!(to_i64, Int64),
            NumberKind::Int128 => bounded!(to_i128, Int128),
            NumberKind::Int256 => bigint_to_i256(&value).map(Int256).ok_or_else(|| out_of_range(&value)),
            NumberKind::Int => Ok(Int(value)),
            NumberKind::UInt8 => bounded!(to_u8, UInt8),
            NumberKind::UInt16 => bounded!(to_u16, UInt16),
            NumberKind::UInt32 => bounded!(to_u32, UInt32),
            NumberKind::UInt64 => bounded!(to_u64, UInt64),
            NumberKind::UInt128 => bounded!(to_u128, UInt128),
            NumberKind::UInt256 => bigint_to_u256(&value).map(UInt256).ok_or_else(|| out_of_range(&value)),
            NumberKind::UInt => {
                if value.sign() == Sign::Minus {
                    Err(Bound::Min.error())
                } else {
                    Ok(UInt(value))
                }
            }
            NumberKind::Word8 => bounded!(to_u8, Word8),
            NumberKind::Word16 => bounded!(to_u16, Word16),
            NumberKind::Word32 => bounded!(to_u32, Word32),
            NumberKind::Word64 => bounded!(to_u64, Word64),
            NumberKind::Word128 => bounded!(to_u128, Word128),
            NumberKind::Word256 => bigint_to_u256(&value).map(Word256).ok_or_else(|| out_of_range(&value)),
            NumberKind::Fix64 => (value * BigInt::from(FIXED_POINT_SCALE))
                .to_i64()
                .map(Fix64)
                .ok_or_else(|| Bound::Max.error()),
            NumberKind::UFix64 => {
                let scaled = value * BigInt::from(FIXED_POINT_SCALE);
                if scaled.sign() == Sign::Minus {
                    return Err(Bound::Min.error());
                }
                scaled.to_u64().map(UFix64).ok_or_else(|| Bound::Max.error())
            }
        }
    }

    /// The exact integer value, for the integer kinds. Fixed-point values
    /// have no integer reading and yield `None`.
    pub fn to_bigint(&self) -> Option<BigInt> {
        use NumberValue::*;
        Some(match self {
            Int8(v) => BigInt::from(*v),
            Int16(v) => BigInt::from(*v),
            Int32(v) => BigInt::from(*v),
            Int64(v) => BigInt::from(*v),
            Int128(v) => BigInt::from(*v),
            Int256(v) => {
                let magnitude =
                    BigInt::from_bytes_be(Sign::Plus, &v.unsigned_abs().to_be_bytes::<32>());
                if v.is_negative() {
                    -magnitude
                } else {
                    magnitude
                }
            }
            Int(v) | UInt(v) => v.clone(),
            UInt8(v) | Word8(v) => BigInt::from(*v),
            UInt16(v) | Word16(v) => BigInt::from(*v),
            UInt32(v) | Word32(v) => BigInt::from(*v),
            UInt64(v) | Word64(v) => BigInt::from(*v),
            UInt128(v) | Word128(v) => BigInt::from(*v),
            UInt256(v) | Word256(v) => BigInt::from_bytes_be(Sign::Plus, &v.to_be_bytes::<32>()),
            Fix64(_) | UFix64(_) => return None,
        })
    }
}

fn bigint_to_u256(value: &BigInt) -> Option<U256> {
    if value.sign() == Sign::Minus {
        return None;
    }
    let (_, bytes) = value.to_bytes_be();
    (bytes.len() <= 32).then(|| U256::from_be_slice(&bytes))
}

fn bigint_to_i256(value: &BigInt) -> Option<I256> {
    let (sign, bytes) = value.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    let magnitude = U256::from_be_slice(&bytes);
    match sign {
        Sign::Minus => {
            // The magnitude of MIN is one past that of MAX.
            let min_magnitude = U256::from(1u8) << 255usize;
            if magnitude > min_magnitude {
                None
            } else if magnitude == min_magnitude {
                Some(I256::MIN)
            } else {
                I256::from_raw(magnitude).checked_neg()
            }
        }
        _ => {
            let signed = I256::from_raw(magnitude);
            (!signed.is_negative() || signed.is_zero()).then_some(signed)
        }
    }
}

fn format_fixed(f: &mut fmt::Formatter<'_>, negative: bool, magnitude: u128) -> fmt::Result {
    let scale = FIXED_POINT_SCALE as u128;
    let sign = if negative { "-" } else { "" };
    write!(f, "{sign}{}.{:08}", magnitude / scale, magnitude % scale)
}

impl fmt::Display for NumberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NumberValue::*;
        match self {
            Int8(v) => write!(f, "{v}"),
            Int16(v) => write!(f, "{v}"),
            Int32(v) => write!(f, "{v}"),
            Int64(v) => write!(f, "{v}"),
            Int128(v) => write!(f, "{v}"),
            Int256(v) => write!(f, "{v}"),
            Int(v) | UInt(v) => write!(f, "{v}"),
            UInt8(v) | Word8(v) => write!(f, "{v}"),
            UInt16(v) | Word16(v) => write!(f, "{v}"),
            UInt32(v) | Word32(v) => write!(f, "{v}"),
            UInt64(v) | Word64(v) => write!(f, "{v}"),
            UInt128(v) | Word128(v) => write!(f, "{v}"),
            UInt256(v) | Word256(v) => write!(f, "{v}"),
            Fix64(v) => format_fixed(f, *v < 0, v.unsigned_abs() as u128),
            UFix64(v) => format_fixed(f, false, *v as u128),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste::paste;

    macro_rules! test_checked_bounds {
        ($($kind:ident: $ty:ty),+ $(,)?) => {
            paste! {
                $(
                    #[test]
                    fn [<test_ $kind:lower _bounds>]() {
                        let max = NumberValue::$kind(<$ty>::MAX);
                        let min = NumberValue::$kind(<$ty>::MIN);
                        let one = NumberValue::$kind(1 as $ty);
                        let zero = NumberValue::$kind(0 as $ty);

                        assert_eq!(
                            max.checked_add(&one).unwrap_err().kind,
                            ErrorKind::Overflow,
                        );
                        assert_eq!(
                            min.checked_subtract(&one).unwrap_err().kind,
                            ErrorKind::Underflow,
                        );
                        assert_eq!(
                            one.checked_divide(&zero).unwrap_err().kind,
                            ErrorKind::DivisionByZero,
                        );

                        // Saturating arithmetic clamps instead.
                        assert_eq!(max.saturating_add(&one).unwrap(), max);
                        assert_eq!(min.saturating_subtract(&one).unwrap(), min);
                        assert_eq!(max.saturating_multiply(&max).unwrap(), max);
                    }
                )+
            }
        };
    }

    test_checked_bounds! {
        Int8: i8, Int16: i16, Int32: i32, Int64: i64, Int128: i128,
        UInt8: u8, UInt16: u16, UInt32: u32, UInt64: u64, UInt128: u128,
    }

    #[test]
    fn test_int256_bounds() {
        let max = NumberValue::Int256(I256::MAX);
        let one = NumberValue::Int256(I256::ONE);
        assert_eq!(max.checked_add(&one).unwrap_err().kind, ErrorKind::Overflow);
        assert_eq!(max.saturating_add(&one).unwrap(), max);
        let min = NumberValue::Int256(I256::MIN);
        let minus_one = NumberValue::Int256(I256::MINUS_ONE);
        assert_eq!(
            min.checked_divide(&minus_one).unwrap_err().kind,
            ErrorKind::Overflow,
        );
        assert_eq!(min.saturating_divide(&minus_one).unwrap(), max);
    }

    #[test]
    fn test_signed_min_divided_by_minus_one() {
        let min = NumberValue::Int8(i8::MIN);
        let minus_one = NumberValue::Int8(-1);
        assert_eq!(
            min.checked_divide(&minus_one).unwrap_err().kind,
            ErrorKind::Overflow,
        );
        assert_eq!(
            min.saturating_divide(&minus_one).unwrap(),
            NumberValue::Int8(i8::MAX),
        );
        // Remainder at the same point is zero, not a trap.
        assert_eq!(
            min.checked_remainder(&minus_one).unwrap(),
            NumberValue::Int8(0),
        );
    }

    #[test]
    fn test_multiplication_underflow_direction() {
        let min = NumberValue::Int8(i8::MIN);
        let two = NumberValue::Int8(2);
        assert_eq!(
            min.checked_multiply(&two).unwrap_err().kind,
            ErrorKind::Underflow,
        );
        assert_eq!(min.saturating_multiply(&two).unwrap(), min);
    }

    #[test]
    fn test_words_wrap() {
        let max = NumberValue::Word8(u8::MAX);
        let one = NumberValue::Word8(1);
        assert_eq!(max.checked_add(&one).unwrap(), NumberValue::Word8(0));
        let zero = NumberValue::Word8(0);
        assert_eq!(zero.checked_subtract(&one).unwrap(), NumberValue::Word8(255));
        assert_eq!(
            zero.checked_divide(&zero).unwrap_err().kind,
            ErrorKind::DivisionByZero,
        );
        assert!(max.saturating_add(&one).is_err());
    }

    #[test]
    fn test_big_int_is_exact() {
        let a = NumberValue::Int(BigInt::from(i128::MAX));
        let b = NumberValue::Int(BigInt::from(i128::MAX));
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(
            sum,
            NumberValue::Int(BigInt::from(i128::MAX) * 2),
        );
        // UInt is exact but bounded below.
        let zero = NumberValue::UInt(BigInt::zero());
        let two = NumberValue::UInt(BigInt::from(2));
        assert_eq!(
            zero.checked_subtract(&two).unwrap_err().kind,
            ErrorKind::Underflow,
        );
        assert_eq!(zero.saturating_subtract(&two).unwrap(), zero);
    }

    #[test]
    fn test_fixed_point() {
        let one_half = NumberValue::Fix64(FIXED_POINT_SCALE as i64 / 2);
        let two = NumberValue::Fix64(2 * FIXED_POINT_SCALE as i64);
        assert_eq!(
            one_half.checked_multiply(&two).unwrap(),
            NumberValue::Fix64(FIXED_POINT_SCALE as i64),
        );
        assert_eq!(
            one_half.checked_divide(&two).unwrap(),
            NumberValue::Fix64(FIXED_POINT_SCALE as i64 / 4),
        );
        assert_eq!(one_half.to_string(), "0.50000000");
        assert_eq!(
            NumberValue::Fix64(-FIXED_POINT_SCALE as i64 / 4).to_string(),
            "-0.25000000",
        );
        let max = NumberValue::UFix64(u64::MAX);
        assert_eq!(max.checked_add(&max).unwrap_err().kind, ErrorKind::Overflow);
        assert_eq!(max.saturating_add(&max).unwrap(), max);
    }

    #[test]
    fn test_shifts() {
        let one = NumberValue::UInt8(1);
        let three = NumberValue::UInt8(3);
        assert_eq!(one.shift_left(&three).unwrap(), NumberValue::UInt8(8));
        let nine = NumberValue::UInt8(9);
        assert_eq!(one.shift_left(&nine).unwrap(), NumberValue::UInt8(0));
        let minus = NumberValue::Int8(-16);
        assert_eq!(
            minus.shift_right(&NumberValue::Int8(2)).unwrap(),
            NumberValue::Int8(-4),
        );
        assert_eq!(
            minus.shift_right(&NumberValue::Int8(100)).unwrap(),
            NumberValue::Int8(-1),
        );
    }

    #[test]
    fn test_from_bigint_range_checks() {
        assert_eq!(
            NumberValue::from_bigint(NumberKind::Int8, BigInt::from(127)).unwrap(),
            NumberValue::Int8(127),
        );
        assert_eq!(
            NumberValue::from_bigint(NumberKind::Int8, BigInt::from(128))
                .unwrap_err()
                .kind,
            ErrorKind::Overflow,
        );
        assert_eq!(
            NumberValue::from_bigint(NumberKind::UInt, BigInt::from(-1))
                .unwrap_err()
                .kind,
            ErrorKind::Underflow,
        );
        let big: BigInt = BigInt::from(7) << 200;
        let round_tripped = NumberValue::from_bigint(NumberKind::UInt256, big.clone())
            .unwrap()
            .to_bigint()
            .unwrap();
        assert_eq!(round_tripped, big);
        let negative: BigInt = -(BigInt::from(7) << 200usize);
        let round_tripped = NumberValue::from_bigint(NumberKind::Int256, negative.clone())
            .unwrap()
            .to_bigint()
            .unwrap();
        assert_eq!(round_tripped, negative);
    }

    #[test]
    fn test_memory_usage() {
        assert_eq!(
            NumberValue::Int8(1).memory_usage(),
            MemoryUsage::number(1),
        );
        assert_eq!(
            NumberValue::UInt256(U256::ZERO).memory_usage(),
            MemoryUsage::number(32),
        );
        let big = NumberValue::Int(BigInt::from(1) << 100);
        assert_eq!(big.memory_usage().kind, tessera_core::MemoryKind::BigInt);
        assert!(big.memory_usage().amount >= 12);
    }
}
