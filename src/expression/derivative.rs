use super::ast::{Expr, Func};

/// Symbolic partial derivative of `expr` with respect to `var`.
///
/// The raw result of the chain/product/quotient rules is returned
/// unsimplified; callers run [`Expr::simplify`] afterwards.
pub fn differentiate(expr: &Expr, var: &str) -> Expr {
    match expr {
        Expr::Const(_) => Expr::Const(0.0),
        Expr::Var(name) => Expr::Const(if name == var { 1.0 } else { 0.0 }),
        Expr::Neg(a) => Expr::Neg(differentiate(a, var).boxed()),
        Expr::Add(a, b) => Expr::add(differentiate(a, var), differentiate(b, var)),
        Expr::Sub(a, b) => Expr::sub(differentiate(a, var), differentiate(b, var)),
        // (ab)' = a'b + ab'
        Expr::Mul(a, b) => Expr::add(
            Expr::mul(differentiate(a, var), (**b).clone()),
            Expr::mul((**a).clone(), differentiate(b, var)),
        ),
        // (a/b)' = (a'b - ab') / b^2
        Expr::Div(a, b) => Expr::div(
            Expr::sub(
                Expr::mul(differentiate(a, var), (**b).clone()),
                Expr::mul((**a).clone(), differentiate(b, var)),
            ),
            Expr::pow((**b).clone(), Expr::Const(2.0)),
        ),
        Expr::Pow(base, exp) => differentiate_pow(base, exp, var),
        Expr::Call(func, arg) => {
            let inner = differentiate(arg, var);
            let arg = (**arg).clone();
            let outer = match func {
                Func::Sin => Expr::call(Func::Cos, arg),
                Func::Cos => Expr::Neg(Expr::call(Func::Sin, arg).boxed()),
                // sec^2 written as 1/cos^2
                Func::Tan => Expr::div(
                    Expr::Const(1.0),
                    Expr::pow(Expr::call(Func::Cos, arg), Expr::Const(2.0)),
                ),
                Func::Exp => Expr::call(Func::Exp, arg),
                Func::Ln => Expr::div(Expr::Const(1.0), arg),
                Func::Sqrt => Expr::div(
                    Expr::Const(1.0),
                    Expr::mul(Expr::Const(2.0), Expr::call(Func::Sqrt, arg)),
                ),
            };
            Expr::mul(outer, inner)
        }
    }
}

fn differentiate_pow(base: &Expr, exp: &Expr, var: &str) -> Expr {
    let exp_s = exp.simplify();
    match exp_s.as_const() {
        // u^c -> c * u^(c-1) * u'
        Some(c) => Expr::mul(
            Expr::mul(
                Expr::Const(c),
                Expr::pow(base.clone(), Expr::Const(c - 1.0)),
            ),
            differentiate(base, var),
        ),
        None => match base.simplify().as_const() {
            // a^v -> a^v * ln(a) * v'
            Some(a) => Expr::mul(
                Expr::mul(
                    Expr::pow(Expr::Const(a), exp.clone()),
                    Expr::Const(a.ln()),
                ),
                differentiate(exp, var),
            ),
            // u^v -> u^v * (v' ln u + v u' / u)
            None => Expr::mul(
                Expr::pow(base.clone(), exp.clone()),
                Expr::add(
                    Expr::mul(
                        differentiate(exp, var),
                        Expr::call(Func::Ln, base.clone()),
                    ),
                    Expr::div(
                        Expr::mul(exp.clone(), differentiate(base, var)),
                        base.clone(),
                    ),
                ),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse;

    fn d(src: &str, var: &str) -> String {
        differentiate(&parse(src).unwrap(), var).simplify().to_string()
    }

    fn eval_at(expr: &Expr, x: f64, y: f64) -> f64 {
        expr.eval_with(&|name: &str| match name {
            "x" => Some(x),
            "y" => Some(y),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn polynomial_rules_simplify_cleanly() {
        assert_eq!(d("(x - 2)^2", "x"), "2*(x - 2)");
        assert_eq!(d("(x - 2)^2 + (y - 3)^2", "y"), "2*(y - 3)");
        assert_eq!(d("x^3", "x"), "3*x^2");
        assert_eq!(d("5*y", "x"), "0");
    }

    #[test]
    fn second_partials_of_a_quadratic_are_constant() {
        let f = parse("(x - 1)^2 + (y - 1)^2").unwrap();
        let dx = differentiate(&f, "x").simplify();
        assert_eq!(differentiate(&dx, "x").simplify(), Expr::Const(2.0));
        assert_eq!(differentiate(&dx, "y").simplify(), Expr::Const(0.0));
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let sources = [
            "x*y + sin(x)*cos(y)",
            "exp(x*y)/(1 + y^2)",
            "ln(x^2 + 1) - sqrt(y + 4)",
            "x^y",
            "2^x + tan(y/3)",
        ];
        let (x, y, h) = (0.7, 1.3, 1e-6);

        for src in sources {
            let f = parse(src).unwrap();
            for var in ["x", "y"] {
                let analytic = eval_at(&differentiate(&f, var).simplify(), x, y);
                let (xp, yp, xm, ym) = if var == "x" {
                    (x + h, y, x - h, y)
                } else {
                    (x, y + h, x, y - h)
                };
                let numeric = (eval_at(&f, xp, yp) - eval_at(&f, xm, ym)) / (2.0 * h);
                assert!(
                    (analytic - numeric).abs() < 1e-5,
                    "d/d{} of {}: analytic {} vs numeric {}",
                    var,
                    src,
                    analytic,
                    numeric
                );
            }
        }
    }
}
