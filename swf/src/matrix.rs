use crate::Twips;

/// A 2D affine transformation matrix, as read from an SWF `MATRIX` record.
///
/// The fields mirror the conventional 2x3 transform matrix:
/// ```text
/// |a c tx|
/// |b d ty|
/// |0 0  1|
/// ```
/// `a`/`d` are the scale terms, `b`/`c` are the rotate/skew terms (both
/// encoded as 16.16 fixed-point in the file), and `tx`/`ty` are the
/// translation terms in twips.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: Twips,
    pub ty: Twips,
}

impl Matrix {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: Twips::ZERO,
        ty: Twips::ZERO,
    };

    pub const fn scale(x: f32, y: f32) -> Self {
        Self {
            a: x,
            d: y,
            ..Self::IDENTITY
        }
    }

    pub const fn translate(x: Twips, y: Twips) -> Self {
        Self {
            tx: x,
            ty: y,
            ..Self::IDENTITY
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Matrix {
    type Output = Self;

    /// Composes two transforms: `self * other` applies `other` first, then `self`.
    fn mul(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            tx: Twips::new(
                (f64::from(self.a) * f64::from(rhs.tx.get())
                    + f64::from(self.c) * f64::from(rhs.ty.get())) as i32,
            ) + self.tx,
            ty: Twips::new(
                (f64::from(self.b) * f64::from(rhs.tx.get())
                    + f64::from(self.d) * f64::from(rhs.ty.get())) as i32,
            ) + self.ty,
        }
    }
}
