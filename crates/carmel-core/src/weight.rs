// Log-domain probability weight and its text codec.
//
// A `Weight` is a nonnegative real stored as its natural logarithm. Addition
// is log-sum-exp, multiplication is addition of logs. Zero and infinity are
// finite sentinels so that arithmetic on them never produces NaN.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};
use std::str::FromStr;

/// Log value of the zero weight.
pub const ZERO_LN: f64 = -f64::MAX;

/// Log value of the infinite weight.
pub const INFINITY_LN: f64 = f64::MAX;

/// If `ln(a) - ln(b)` exceeds this, `a + b` is taken to be exactly `a`.
///
/// A double has 52 mantissa bits, about 36 natural-log units of relative
/// precision; beyond that the smaller operand cannot change the sum.
pub const MUCH_BIGGER_LN: f64 = 36.0;

/// Reals whose log magnitude is below this are printed as plain decimals
/// when the output threshold is [`LogThreshold::Sometimes`].
pub const LN_TILL_UNDERFLOW: f64 = 82.0;

/// Error returned when a weight literal cannot be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightParseError {
    #[error("empty weight literal")]
    Empty,
    #[error("malformed weight literal `{0}`")]
    Malformed(String),
    #[error("negative weight `{0}`")]
    Negative(String),
}

/// A nonnegative real represented by its natural logarithm.
#[derive(Clone, Copy)]
pub struct Weight(f64);

impl Weight {
    #[inline]
    pub const fn zero() -> Self {
        Weight(ZERO_LN)
    }

    #[inline]
    pub const fn one() -> Self {
        Weight(0.0)
    }

    #[inline]
    pub const fn infinity() -> Self {
        Weight(INFINITY_LN)
    }

    /// Build a weight from its natural log. NaN maps to zero and values
    /// beyond the sentinels are clamped onto them.
    #[inline]
    pub fn from_ln(ln: f64) -> Self {
        if ln.is_nan() {
            Self::zero()
        } else {
            Weight(ln.clamp(ZERO_LN, INFINITY_LN))
        }
    }

    /// Build a weight from a real value; anything not strictly positive is zero.
    #[inline]
    pub fn from_real(x: f64) -> Self {
        if x > 0.0 { Self::from_ln(x.ln()) } else { Self::zero() }
    }

    /// Build a weight from a cost (`-ln`).
    #[inline]
    pub fn from_cost(cost: f64) -> Self {
        Self::from_ln(-cost)
    }

    #[inline]
    pub fn ln(self) -> f64 {
        self.0
    }

    /// The cost of this weight, `-ln(w)`. Zero maps to `+inf`.
    #[inline]
    pub fn cost(self) -> f64 {
        if self.is_zero() { f64::INFINITY } else { -self.0 }
    }

    #[inline]
    pub fn to_real(self) -> f64 {
        if self.is_zero() { 0.0 } else { self.0.exp() }
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        !(self.0 > ZERO_LN)
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > ZERO_LN
    }

    #[inline]
    pub fn is_one(self) -> bool {
        self.0 == 0.0
    }

    #[inline]
    pub fn is_infinity(self) -> bool {
        self.0 >= INFINITY_LN
    }

    /// Whether the value can be printed as a plain decimal without
    /// overflowing or losing all precision.
    pub fn fits_in_real(self) -> bool {
        self.is_zero() || (self.0 < LN_TILL_UNDERFLOW && self.0 > -LN_TILL_UNDERFLOW)
    }

    /// `self ^ exponent`.
    pub fn pow(self, exponent: f64) -> Self {
        if self.is_zero() {
            return match exponent.partial_cmp(&0.0) {
                Some(Ordering::Greater) => Self::zero(),
                Some(Ordering::Less) => Self::infinity(),
                _ => Self::one(),
            };
        }
        Self::from_ln(self.0 * exponent)
    }

    /// `self ^ (1/n)`.
    pub fn root(self, n: f64) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        Self::from_ln(self.0 / n)
    }

    /// Reciprocal, `1 / self`.
    pub fn invert(self) -> Self {
        if self.is_zero() {
            Self::infinity()
        } else if self.is_infinity() {
            Self::zero()
        } else {
            Weight(-self.0)
        }
    }

    /// Approximate equality on log values; zeros compare equal to each other.
    pub fn approx_eq(self, other: Self, epsilon: f64) -> bool {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => true,
            (false, false) => (self.0 - other.0).abs() <= epsilon,
            _ => false,
        }
    }

    /// Wrap this weight for printing with an explicit format.
    pub fn display(self, format: WeightFormat) -> WeightDisplay {
        WeightDisplay {
            weight: self,
            format,
        }
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::zero()
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

impl Add for Weight {
    type Output = Weight;

    fn add(self, rhs: Weight) -> Weight {
        let diff = self.0 - rhs.0;
        if diff > MUCH_BIGGER_LN {
            return self;
        }
        if diff < -MUCH_BIGGER_LN {
            return rhs;
        }
        if diff < 0.0 {
            Weight::from_ln(rhs.0 + diff.exp().ln_1p())
        } else {
            Weight::from_ln(self.0 + (-diff).exp().ln_1p())
        }
    }
}

impl Sub for Weight {
    type Output = Weight;

    /// Difference clamped at zero: `a - b` with `b >= a` is zero, not an error.
    fn sub(self, rhs: Weight) -> Weight {
        let rdiff = rhs.0 - self.0;
        if rdiff >= 0.0 {
            return Weight::zero();
        }
        if rdiff < -MUCH_BIGGER_LN {
            return self;
        }
        Weight::from_ln(self.0 + (-rdiff.exp()).ln_1p())
    }
}

impl Mul for Weight {
    type Output = Weight;

    #[inline]
    fn mul(self, rhs: Weight) -> Weight {
        Weight::from_ln(self.0 + rhs.0)
    }
}

impl Div for Weight {
    type Output = Weight;

    /// Division by a zero weight yields a huge but finite value; callers
    /// that care must check `rhs.is_zero()` first.
    #[inline]
    fn div(self, rhs: Weight) -> Weight {
        Weight::from_ln(self.0 - rhs.0)
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Weight) {
        *self = *self + rhs;
    }
}

impl SubAssign for Weight {
    fn sub_assign(&mut self, rhs: Weight) {
        *self = *self - rhs;
    }
}

impl MulAssign for Weight {
    fn mul_assign(&mut self, rhs: Weight) {
        *self = *self * rhs;
    }
}

impl DivAssign for Weight {
    fn div_assign(&mut self, rhs: Weight) {
        *self = *self / rhs;
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Weight {
        iter.fold(Weight::zero(), |acc, w| acc + w)
    }
}

impl<'a> Sum<&'a Weight> for Weight {
    fn sum<I: Iterator<Item = &'a Weight>>(iter: I) -> Weight {
        iter.fold(Weight::zero(), |acc, w| acc + *w)
    }
}

// Log is monotonic, so comparing log values compares the reals.
impl PartialEq for Weight {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Weight {}

impl PartialOrd for Weight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Weight {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for Weight {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Weight {
    fn from(x: f64) -> Self {
        Weight::from_real(x)
    }
}

// ---------------------------------------------------------------------------
// Text format
// ---------------------------------------------------------------------------

/// How a weight outside the plain-decimal range is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogStyle {
    /// `-2.5ln`
    Ln,
    /// `e^-2.5`
    #[default]
    Exp,
}

/// When to use the log form instead of a plain decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogThreshold {
    /// Plain decimal whenever it fits, log form otherwise.
    #[default]
    Sometimes,
    /// Always the log form (zero is still `0`).
    Always,
    /// Always a plain decimal.
    Never,
}

/// Output format for weights. Reading accepts every form regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeightFormat {
    pub style: LogStyle,
    pub threshold: LogThreshold,
}

impl WeightFormat {
    pub const fn plain() -> Self {
        Self {
            style: LogStyle::Exp,
            threshold: LogThreshold::Never,
        }
    }

    pub const fn always_log(style: LogStyle) -> Self {
        Self {
            style,
            threshold: LogThreshold::Always,
        }
    }
}

/// A weight bound to a [`WeightFormat`], returned by [`Weight::display`].
pub struct WeightDisplay {
    weight: Weight,
    format: WeightFormat,
}

impl fmt::Display for WeightDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.weight;
        if w.is_zero() {
            return f.write_str("0");
        }
        let plain = match self.format.threshold {
            LogThreshold::Never => true,
            LogThreshold::Always => false,
            LogThreshold::Sometimes => w.fits_in_real(),
        };
        if plain {
            write!(f, "{}", w.to_real())
        } else {
            match self.format.style {
                LogStyle::Ln => write!(f, "{}ln", w.ln()),
                LogStyle::Exp => write!(f, "e^{}", w.ln()),
            }
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display(WeightFormat::default()).fmt(f)
    }
}

impl fmt::Debug for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "Weight(0)")
        } else {
            write!(f, "Weight(e^{})", self.0)
        }
    }
}

impl FromStr for Weight {
    type Err = WeightParseError;

    /// Accepts `0`, a plain decimal real, `<x>ln` and `e^<x>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(WeightParseError::Empty);
        }
        let malformed = || WeightParseError::Malformed(s.to_string());
        if let Some(exponent) = s.strip_prefix("e^") {
            let ln: f64 = exponent.parse().map_err(|_| malformed())?;
            return Ok(Weight::from_ln(ln));
        }
        if let Some(mantissa) = s.strip_suffix("ln") {
            let ln: f64 = mantissa.parse().map_err(|_| malformed())?;
            return Ok(Weight::from_ln(ln));
        }
        let real: f64 = s.parse().map_err(|_| malformed())?;
        if real.is_nan() {
            return Err(malformed());
        }
        if real < 0.0 {
            return Err(WeightParseError::Negative(s.to_string()));
        }
        Ok(Weight::from_real(real))
    }
}
