use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Rational number, used for the bytes per pixel ratio of packed formats
///
/// 10 bit formats pack three pixels into four bytes, so their ratio is 4/3.
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    /// Returns a fraction representation
    ///
    /// # Arguments
    ///
    /// * `num` - Numerator
    /// * `denom` - Denominator
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::Fraction;
    /// let bpp = Fraction::new(4, 3);
    /// assert_eq!(bpp.scale(1920), 2560);
    /// ```
    pub const fn new(num: u32, denom: u32) -> Self {
        Fraction {
            numerator: num,
            denominator: denom,
        }
    }

    /// Multiplies `value` by the fraction, rounding down
    pub fn scale(&self, value: u32) -> u32 {
        (value as u64 * self.numerator as u64 / self.denominator.max(1) as u64) as u32
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::new(1, 1)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
