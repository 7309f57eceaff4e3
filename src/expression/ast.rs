use std::collections::BTreeSet;
use std::fmt;

/// Elementary functions understood by the parser and the differentiator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "exp" => Some(Self::Exp),
            "ln" | "log" => Some(Self::Ln),
            "sqrt" => Some(Self::Sqrt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Sqrt => "sqrt",
        }
    }

    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
            Self::Sqrt => x.sqrt(),
        }
    }
}

/// Expression tree over named variables.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(f64),
    Var(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

// Binding strength used by the printer.
const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_NEG: u8 = 3;
const PREC_POW: u8 = 4;
const PREC_ATOM: u8 = 5;

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        Expr::Add(a.boxed(), b.boxed())
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        Expr::Sub(a.boxed(), b.boxed())
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        Expr::Mul(a.boxed(), b.boxed())
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        Expr::Div(a.boxed(), b.boxed())
    }

    pub fn pow(a: Expr, b: Expr) -> Self {
        Expr::Pow(a.boxed(), b.boxed())
    }

    pub fn call(func: Func, arg: Expr) -> Self {
        Expr::Call(func, arg.boxed())
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(c) => Some(*c),
            _ => None,
        }
    }

    fn is_const(&self, value: f64) -> bool {
        matches!(self, Expr::Const(c) if *c == value)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Const(c) if *c < 0.0 => PREC_NEG,
            Expr::Const(_) | Expr::Var(_) | Expr::Call(..) => PREC_ATOM,
            Expr::Neg(_) => PREC_NEG,
            Expr::Add(..) | Expr::Sub(..) => PREC_ADD,
            Expr::Mul(..) | Expr::Div(..) => PREC_MUL,
            Expr::Pow(..) => PREC_POW,
        }
    }

    /// Collect every variable name referenced by the tree.
    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Neg(a) | Expr::Call(_, a) => a.collect_variables(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
        }
    }

    /// Tree-walking evaluation. `lookup` returns `None` for unbound names,
    /// which is reported back as `Err(name)`.
    pub fn eval_with<F>(&self, lookup: &F) -> Result<f64, String>
    where
        F: Fn(&str) -> Option<f64>,
    {
        Ok(match self {
            Expr::Const(c) => *c,
            Expr::Var(name) => lookup(name).ok_or_else(|| name.clone())?,
            Expr::Neg(a) => -a.eval_with(lookup)?,
            Expr::Add(a, b) => a.eval_with(lookup)? + b.eval_with(lookup)?,
            Expr::Sub(a, b) => a.eval_with(lookup)? - b.eval_with(lookup)?,
            Expr::Mul(a, b) => a.eval_with(lookup)? * b.eval_with(lookup)?,
            Expr::Div(a, b) => a.eval_with(lookup)? / b.eval_with(lookup)?,
            Expr::Pow(a, b) => a.eval_with(lookup)?.powf(b.eval_with(lookup)?),
            Expr::Call(func, a) => func.apply(a.eval_with(lookup)?),
        })
    }

    /// Degree of the expression as a polynomial in all of its variables.
    ///
    /// Returns `None` when the expression is not a polynomial: division by
    /// a non-constant, a variable or fractional exponent, or a function
    /// applied to a non-constant argument.
    pub fn polynomial_degree(&self) -> Option<u32> {
        match self {
            Expr::Const(_) => Some(0),
            Expr::Var(_) => Some(1),
            Expr::Neg(a) => a.polynomial_degree(),
            Expr::Add(a, b) | Expr::Sub(a, b) => {
                Some(a.polynomial_degree()?.max(b.polynomial_degree()?))
            }
            Expr::Mul(a, b) => Some(a.polynomial_degree()? + b.polynomial_degree()?),
            Expr::Div(a, b) => match b.polynomial_degree()? {
                0 => a.polynomial_degree(),
                _ => None,
            },
            Expr::Pow(base, exp) => {
                let base_degree = base.polynomial_degree()?;
                if exp.polynomial_degree()? != 0 {
                    return None;
                }
                if base_degree == 0 {
                    return Some(0);
                }
                let n = exp.simplify().as_const()?;
                if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
                    return None;
                }
                base_degree.checked_mul(n as u32)
            }
            Expr::Call(_, a) => match a.polynomial_degree()? {
                0 => Some(0),
                _ => None,
            },
        }
    }

    /// Bottom-up algebraic cleanup: constant folding and the usual
    /// additive and multiplicative identities.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Const(_) | Expr::Var(_) => self.clone(),
            Expr::Neg(a) => match a.simplify() {
                Expr::Const(c) => Expr::Const(-c),
                Expr::Neg(inner) => *inner,
                other => Expr::Neg(other.boxed()),
            },
            Expr::Add(a, b) => {
                let (a, b) = (a.simplify(), b.simplify());
                match (&a, &b) {
                    (Expr::Const(x), Expr::Const(y)) => Expr::Const(x + y),
                    _ if a.is_const(0.0) => b,
                    _ if b.is_const(0.0) => a,
                    (_, Expr::Neg(inner)) => Expr::Sub(a.boxed(), inner.clone()),
                    _ => Expr::add(a, b),
                }
            }
            Expr::Sub(a, b) => {
                let (a, b) = (a.simplify(), b.simplify());
                match (&a, &b) {
                    (Expr::Const(x), Expr::Const(y)) => Expr::Const(x - y),
                    _ if b.is_const(0.0) => a,
                    _ if a.is_const(0.0) => Expr::Neg(b.boxed()).simplify(),
                    (_, Expr::Neg(inner)) => Expr::Add(a.boxed(), inner.clone()),
                    _ if a == b => Expr::Const(0.0),
                    _ => Expr::sub(a, b),
                }
            }
            Expr::Mul(a, b) => {
                let (a, b) = (a.simplify(), b.simplify());
                match (&a, &b) {
                    (Expr::Const(x), Expr::Const(y)) => Expr::Const(x * y),
                    _ if a.is_const(0.0) || b.is_const(0.0) => Expr::Const(0.0),
                    _ if a.is_const(1.0) => b,
                    _ if b.is_const(1.0) => a,
                    _ if a.is_const(-1.0) => Expr::Neg(b.boxed()).simplify(),
                    _ if b.is_const(-1.0) => Expr::Neg(a.boxed()).simplify(),
                    // c1 * (c2 * x) -> (c1*c2) * x
                    (Expr::Const(x), Expr::Mul(inner_a, inner_b)) => match inner_a.as_const() {
                        Some(y) => Expr::Mul(Expr::Const(x * y).boxed(), inner_b.clone()),
                        None => Expr::mul(a, b),
                    },
                    // keep constants on the left
                    (_, Expr::Const(_)) => Expr::mul(b, a),
                    _ => Expr::mul(a, b),
                }
            }
            Expr::Div(a, b) => {
                let (a, b) = (a.simplify(), b.simplify());
                match (&a, &b) {
                    (Expr::Const(x), Expr::Const(y)) if *y != 0.0 => Expr::Const(x / y),
                    _ if b.is_const(1.0) => a,
                    _ if a.is_const(0.0) && !b.is_const(0.0) => Expr::Const(0.0),
                    _ => Expr::div(a, b),
                }
            }
            Expr::Pow(a, b) => {
                let (a, b) = (a.simplify(), b.simplify());
                match (&a, &b) {
                    (Expr::Const(x), Expr::Const(y)) if x.powf(*y).is_finite() => {
                        Expr::Const(x.powf(*y))
                    }
                    _ if b.is_const(0.0) => Expr::Const(1.0),
                    _ if b.is_const(1.0) => a,
                    _ if a.is_const(1.0) => Expr::Const(1.0),
                    _ => Expr::pow(a, b),
                }
            }
            Expr::Call(func, a) => match a.simplify() {
                Expr::Const(c) if func.apply(c).is_finite() => Expr::Const(func.apply(c)),
                other => Expr::call(*func, other),
            },
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

// Canonical printed form: "x^2 + 3*y - sin(x)/2"
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{}", c),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Neg(a) => {
                write!(f, "-")?;
                a.fmt_child(f, a.precedence() <= PREC_NEG)
            }
            Expr::Add(a, b) => {
                a.fmt_child(f, a.precedence() < PREC_ADD)?;
                write!(f, " + ")?;
                b.fmt_child(f, b.precedence() <= PREC_ADD)
            }
            Expr::Sub(a, b) => {
                a.fmt_child(f, a.precedence() < PREC_ADD)?;
                write!(f, " - ")?;
                b.fmt_child(f, b.precedence() <= PREC_ADD)
            }
            Expr::Mul(a, b) => {
                a.fmt_child(f, a.precedence() < PREC_MUL)?;
                write!(f, "*")?;
                b.fmt_child(f, b.precedence() <= PREC_MUL)
            }
            Expr::Div(a, b) => {
                a.fmt_child(f, a.precedence() < PREC_MUL)?;
                write!(f, "/")?;
                b.fmt_child(f, b.precedence() <= PREC_MUL)
            }
            Expr::Pow(a, b) => {
                a.fmt_child(f, a.precedence() <= PREC_POW)?;
                write!(f, "^")?;
                b.fmt_child(f, b.precedence() < PREC_POW)
            }
            Expr::Call(func, a) => write!(f, "{}({})", func.name(), a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn prints_with_minimal_parentheses() {
        let e = Expr::add(
            Expr::pow(Expr::sub(x(), Expr::Const(2.0)), Expr::Const(2.0)),
            Expr::mul(Expr::Const(3.0), Expr::var("y")),
        );
        assert_eq!(e.to_string(), "(x - 2)^2 + 3*y");
    }

    #[test]
    fn negative_constants_are_wrapped_in_powers() {
        let e = Expr::pow(Expr::Const(-2.0), x());
        assert_eq!(e.to_string(), "(-2)^x");
    }

    #[test]
    fn simplify_folds_identities() {
        let e = Expr::mul(
            Expr::Const(1.0),
            Expr::add(Expr::pow(x(), Expr::Const(1.0)), Expr::Const(0.0)),
        );
        assert_eq!(e.simplify(), x());

        let folded = Expr::mul(Expr::Const(2.0), Expr::mul(Expr::Const(3.0), x()));
        assert_eq!(folded.simplify().to_string(), "6*x");
    }

    #[test]
    fn degree_of_polynomials() {
        let quad = Expr::add(
            Expr::pow(x(), Expr::Const(2.0)),
            Expr::mul(x(), Expr::var("y")),
        );
        assert_eq!(quad.polynomial_degree(), Some(2));

        let quartic = Expr::pow(Expr::sub(x(), Expr::Const(1.0)), Expr::Const(4.0));
        assert_eq!(quartic.polynomial_degree(), Some(4));

        assert_eq!(Expr::div(Expr::Const(1.0), x()).polynomial_degree(), None);
        assert_eq!(Expr::call(Func::Sin, x()).polynomial_degree(), None);
        assert_eq!(Expr::pow(x(), Expr::Const(0.5)).polynomial_degree(), None);
    }
}
