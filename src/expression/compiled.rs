use super::ast::{Expr, Func};
use crate::error::EvaluationError;

/// Compact bytecode instruction
#[derive(Debug, Clone, Copy)]
enum OpCode {
    LoadVar(u16),
    LoadConst(u16),
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Call(Func),
}

/// Expression compiled against an ordered variable list.
///
/// Solvers evaluate the same gradient and Hessian entries once per
/// iteration, so each derivative is lowered once into a flat postfix
/// program and then run against a point slice.
#[derive(Clone, Debug)]
pub struct CompiledExpression {
    instructions: Vec<OpCode>,
    constants: Vec<f64>, // Constant pool
    var_count: u16,
    max_stack: usize,
    source: String,
}

impl CompiledExpression {
    /// Compile `expr` so that `values[i]` binds `variables[i]`.
    ///
    /// Fails with [`EvaluationError::UnboundVariable`] if the tree references a
    /// name that is not in `variables`.
    pub fn compile(expr: &Expr, variables: &[String]) -> Result<Self, EvaluationError> {
        let var_count = slot("variable", variables.len())?;
        let mut compiler = Compiler::new(variables);
        compiler.emit(expr)?;

        Ok(CompiledExpression {
            instructions: compiler.instructions,
            constants: compiler.constants,
            var_count,
            max_stack: compiler.max_depth,
            source: expr.to_string(),
        })
    }

    #[inline]
    pub fn evaluate(&self, values: &[f64]) -> Result<f64, EvaluationError> {
        if values.len() != self.var_count as usize {
            return Err(EvaluationError::ArityMismatch {
                expected: self.var_count as usize,
                found: values.len(),
            });
        }

        let mut stack: Vec<f64> = Vec::with_capacity(self.max_stack);

        for &inst in &self.instructions {
            match inst {
                OpCode::LoadVar(idx) => stack.push(values[idx as usize]),
                OpCode::LoadConst(idx) => stack.push(self.constants[idx as usize]),
                OpCode::Neg => {
                    if let Some(top) = stack.last_mut() {
                        *top = -*top;
                    }
                }
                OpCode::Call(func) => {
                    if let Some(top) = stack.last_mut() {
                        *top = func.apply(*top);
                    }
                }
                op => {
                    let rhs = stack.pop().unwrap_or(f64::NAN);
                    let lhs = stack.last_mut();
                    if let Some(lhs) = lhs {
                        *lhs = match op {
                            OpCode::Add => *lhs + rhs,
                            OpCode::Sub => *lhs - rhs,
                            OpCode::Mul => *lhs * rhs,
                            OpCode::Div => *lhs / rhs,
                            OpCode::Pow => lhs.powf(rhs),
                            _ => unreachable!("unary opcodes are handled above"),
                        };
                    }
                }
            }
        }

        let value = stack.pop().unwrap_or(f64::NAN);
        if !value.is_finite() {
            return Err(EvaluationError::NonFinite {
                expression: self.source.clone(),
                value,
            });
        }
        Ok(value)
    }
}

/// Operand slots are `u16`; larger indices are rejected rather than wrapped.
fn slot(what: &'static str, index: usize) -> Result<u16, EvaluationError> {
    u16::try_from(index).map_err(|_| EvaluationError::TooLarge {
        what,
        count: index,
        limit: u16::MAX as usize,
    })
}

struct Compiler<'a> {
    variables: &'a [String],
    instructions: Vec<OpCode>,
    constants: Vec<f64>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Compiler<'a> {
    fn new(variables: &'a [String]) -> Self {
        Self {
            variables,
            instructions: Vec::with_capacity(32),
            constants: Vec::with_capacity(8),
            depth: 0,
            max_depth: 0,
        }
    }

    fn add_const(&mut self, val: f64) -> Result<u16, EvaluationError> {
        // Reuse existing constants
        if let Some(idx) = self.constants.iter().position(|&v| v == val) {
            return slot("constant", idx);
        }
        let idx = slot("constant", self.constants.len())?;
        self.constants.push(val);
        Ok(idx)
    }

    fn push(&mut self, op: OpCode) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.instructions.push(op);
    }

    fn binary(&mut self, a: &Expr, b: &Expr, op: OpCode) -> Result<(), EvaluationError> {
        self.emit(a)?;
        self.emit(b)?;
        self.depth -= 1;
        self.instructions.push(op);
        Ok(())
    }

    fn emit(&mut self, expr: &Expr) -> Result<(), EvaluationError> {
        match expr {
            Expr::Const(c) => {
                let idx = self.add_const(*c)?;
                self.push(OpCode::LoadConst(idx));
            }
            Expr::Var(name) => {
                let idx = self.variables.iter().position(|v| v == name).ok_or_else(|| {
                    EvaluationError::UnboundVariable { name: name.clone() }
                })?;
                self.push(OpCode::LoadVar(slot("variable", idx)?));
            }
            Expr::Neg(a) => {
                self.emit(a)?;
                self.instructions.push(OpCode::Neg);
            }
            Expr::Call(func, a) => {
                self.emit(a)?;
                self.instructions.push(OpCode::Call(*func));
            }
            Expr::Add(a, b) => self.binary(a, b, OpCode::Add)?,
            Expr::Sub(a, b) => self.binary(a, b, OpCode::Sub)?,
            Expr::Mul(a, b) => self.binary(a, b, OpCode::Mul)?,
            Expr::Div(a, b) => self.binary(a, b, OpCode::Div)?,
            Expr::Pow(a, b) => self.binary(a, b, OpCode::Pow)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse;

    fn names(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn compiled_matches_tree_walk() {
        let expr = parse("(x - 2)^2 + 3*x*y - sin(y)/exp(x)").unwrap();
        let compiled = CompiledExpression::compile(&expr, &names(&["x", "y"])).unwrap();

        let (x, y) = (1.25, -0.5);
        let expected = expr
            .eval_with(&|n: &str| match n {
                "x" => Some(x),
                "y" => Some(y),
                _ => None,
            })
            .unwrap();
        assert_eq!(compiled.evaluate(&[x, y]).unwrap(), expected);
    }

    #[test]
    fn unknown_identifier_fails_to_compile() {
        let expr = parse("x + z").unwrap();
        let err = CompiledExpression::compile(&expr, &names(&["x", "y"])).unwrap_err();
        assert_eq!(err, EvaluationError::UnboundVariable { name: "z".into() });
    }

    #[test]
    fn variable_slots_are_bounded() {
        let mut vars: Vec<String> = (0..=u16::MAX as usize).map(|i| format!("v{}", i)).collect();
        vars.push("x".into());
        let err = CompiledExpression::compile(&parse("x").unwrap(), &vars).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::TooLarge {
                what: "variable",
                count: vars.len(),
                limit: u16::MAX as usize,
            }
        );

        vars.truncate(u16::MAX as usize - 1);
        vars.push("x".into());
        let compiled = CompiledExpression::compile(&parse("2x").unwrap(), &vars).unwrap();
        let mut point = vec![0.0; vars.len()];
        *point.last_mut().unwrap() = 3.0;
        assert_eq!(compiled.evaluate(&point).unwrap(), 6.0);
    }

    #[test]
    fn arity_and_finiteness_are_checked() {
        let expr = parse("1/x").unwrap();
        let compiled = CompiledExpression::compile(&expr, &names(&["x"])).unwrap();

        assert!(matches!(
            compiled.evaluate(&[1.0, 2.0]),
            Err(EvaluationError::ArityMismatch { expected: 1, found: 2 })
        ));
        assert!(matches!(
            compiled.evaluate(&[0.0]),
            Err(EvaluationError::NonFinite { .. })
        ));
        assert_eq!(compiled.evaluate(&[4.0]).unwrap(), 0.25);
    }
}
