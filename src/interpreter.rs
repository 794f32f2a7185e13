//! Tree‑walking evaluator.
//!
//! Statements execute to a [`ExecSignal`] (`Normal` or `Return(value)`) inside
//! a crate [`Result`]; the `Err` arm carries runtime errors. A `return` thus
//! travels up through blocks and loops as an ordinary value until the
//! function call that issued the body catches it.

use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{Environment, SharedEnv};
use crate::error::{Result, RuntimeError, RuntimeErrorKind};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{Callable, Value};

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum ExecSignal {
    Normal,
    /// A `return` is unwinding towards the enclosing call.
    Return(Value),
}

pub struct Interpreter {
    globals: SharedEnv,
    environment: SharedEnv,
    locals: Locals,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout, with the native
    /// builtins (`clock`) defined as globals.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Same as [`Interpreter::new`] but `print` writes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: SharedEnv = Environment::new().into_shared();

        let mut interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        };

        interpreter.define_native(NativeFunction::clock());

        interpreter
    }

    pub fn define_native(&mut self, native: NativeFunction) {
        debug!("Defining native function '{}'", native.name);

        let name = native.name;
        self.globals
            .borrow_mut()
            .define(name, Value::Callable(Callable::Native(Rc::new(native))));
    }

    /// Runs a resolved program. `locals` is merged into the distances already
    /// known (earlier REPL lines stay valid). Stops at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt], locals: Locals) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        self.locals.extend(locals);

        let result = self.execute_top_level(statements);

        // output produced before a runtime error is kept
        self.output.flush()?;

        if result.is_ok() {
            info!("Interpretation completed successfully");
        }

        result
    }

    fn execute_top_level(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            if let ExecSignal::Return(_) = self.execute(stmt)? {
                warn!("'return' escaped to top level; the resolver should have rejected it");
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<ExecSignal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let environment = Environment::child_of(&self.environment);
                return self.execute_block(statements, environment);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_stmt) = else_branch {
                    return self.execute(else_stmt);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let ExecSignal::Return(value) = self.execute(body)? {
                        return Ok(ExecSignal::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);
                return Ok(ExecSignal::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.declare_class(name, superclass.as_ref(), methods)?,
        }

        Ok(ExecSignal::Normal)
    }

    /// Run `statements` with `environment` active, restoring the previous
    /// environment on every exit path (normal, `return`, or error).
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: SharedEnv,
    ) -> Result<ExecSignal> {
        debug!("Entering block with {} statements", statements.len());

        let previous = mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<ExecSignal> {
        for stmt in statements {
            if let ExecSignal::Return(value) = self.execute(stmt)? {
                return Ok(ExecSignal::Return(value));
            }
        }

        Ok(ExecSignal::Normal)
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value.as_class() {
                    Some(class) => Some(Rc::clone(class)),
                    None => {
                        return Err(
                            RuntimeError::type_error(name.line, "Superclass must be a class.")
                                .into(),
                        );
                    }
                }
            }
            None => None,
        };

        // placeholder so method bodies can refer to the class by name
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let enclosing = Rc::clone(&self.environment);

        if let Some(superclass) = &superclass {
            let frame = Environment::child_of(&self.environment);
            frame.borrow_mut().define(
                "super",
                Value::Callable(Callable::Class(Rc::clone(superclass))),
            );
            self.environment = frame;
        }

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&self.environment),
                    method.name.lexeme == "init",
                );
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme.clone(), superclass, methods);

        self.environment = enclosing;

        self.environment.borrow_mut().assign(
            &name.lexeme,
            Value::Callable(Callable::Class(Rc::new(class))),
            name.line,
        )?;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                    None => self.globals.borrow_mut().assign(
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(RuntimeError::type_error(name.line, "Only instances have properties.").into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::type_error(name.line, "Only instances have fields.").into());
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        let value = match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)?
            }
            None => self.globals.borrow().get(&name.lexeme, name.line)?,
        };

        Ok(value)
    }

    fn evaluate_unary(&mut self, op: &Token, expr: &Expr) -> Result<Value> {
        let right_val = self.evaluate(expr)?;

        match op.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::type_error(op.line, "Operand must be a number.").into()),
            },

            TokenType::BANG => Ok(Value::Bool(!right_val.is_truthy())),

            _ => unreachable!("parser only produces '-' and '!' unary operators"),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        debug!(
            "Binary '{}': left={}, right={}",
            op.lexeme, left_val, right_val
        );

        let value = match op.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                (Value::String(a), Value::String(b)) => Value::String(a + &b),
                _ => {
                    return Err(RuntimeError::type_error(
                        op.line,
                        "Operands must be two numbers or two strings.",
                    )
                    .into());
                }
            },

            TokenType::EQUAL_EQUAL => Value::Bool(left_val.is_equal(&right_val)),
            TokenType::BANG_EQUAL => Value::Bool(!left_val.is_equal(&right_val)),

            _ => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;

                match op.token_type {
                    TokenType::MINUS => Value::Number(a - b),
                    TokenType::STAR => Value::Number(a * b),
                    // IEEE semantics: x / 0 is ±inf or NaN
                    TokenType::SLASH => Value::Number(a / b),
                    TokenType::GREATER => Value::Bool(a > b),
                    TokenType::GREATER_EQUAL => Value::Bool(a >= b),
                    TokenType::LESS => Value::Bool(a < b),
                    TokenType::LESS_EQUAL => Value::Bool(a <= b),
                    _ => unreachable!("parser only produces known binary operators"),
                }
            }
        };

        Ok(value)
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<Value> {
        let callee_val = self.evaluate(callee)?;

        let mut arg_values = Vec::with_capacity(arguments.len());
        for arg in arguments {
            arg_values.push(self.evaluate(arg)?);
        }

        let Value::Callable(callable) = callee_val else {
            return Err(RuntimeError::new(
                RuntimeErrorKind::NotCallable,
                paren.line,
                "Can only call functions and classes.",
            )
            .into());
        };

        if arg_values.len() != callable.arity() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::ArityMismatch,
                paren.line,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arg_values.len()
                ),
            )
            .into());
        }

        debug!("Calling {}", callable);

        callable.call(self, arg_values, paren.line)
    }

    /// `super.method`: the superclass lives `distance` frames out and the
    /// instance one frame closer.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance = *self
            .locals
            .get(&id)
            .ok_or_else(|| RuntimeError::undefined_variable("super", keyword.line))?;

        let superclass = Environment::get_at(&self.environment, distance, "super", keyword.line)?;
        let this = Environment::get_at(
            &self.environment,
            distance.saturating_sub(1),
            "this",
            keyword.line,
        )?;

        let (Some(superclass), Value::Instance(instance)) = (superclass.as_class(), this) else {
            return Err(RuntimeError::type_error(keyword.line, "Superclass must be a class.").into());
        };

        let bound = superclass
            .find_method(&method.lexeme)
            .ok_or_else(|| RuntimeError::undefined_property(&method.lexeme, method.line))?
            .bind(&instance);

        Ok(Value::Callable(Callable::Function(Rc::new(bound))))
    }
}

fn number_operands(op: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::type_error(op.line, "Operands must be numbers.").into()),
    }
}
