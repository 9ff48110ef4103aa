use crate::schema::simple_name;

/// Expressions the synthesizer can produce.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Expr {
    Var(String),
    /// A type used as the receiver of a static call.
    TypeRef(String),
    Literal(String),
    New {
        ty: String,
        args: Vec<Expr>,
    },
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// Stub implementation of a single abstract method; `result` is the
    /// literal it returns, if the method is not void.
    Lambda {
        params: Vec<String>,
        result: Option<String>,
    },
    Assign {
        target: String,
        value: Box<Expr>,
    },
    NotEqual {
        value: Box<Expr>,
        literal: String,
    },
    And(Vec<Expr>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn call(receiver: Expr, method: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            receiver: Box::new(receiver),
            method: method.to_string(),
            args,
        }
    }

    pub fn assign(target: &str, value: Expr) -> Self {
        Expr::Assign {
            target: target.to_string(),
            value: Box::new(value),
        }
    }

    pub fn not_equal(value: Expr, literal: &str) -> Self {
        Expr::NotEqual {
            value: Box::new(value),
            literal: literal.to_string(),
        }
    }

    /// Conjunction; a single operand stands for itself.
    pub fn and(mut parts: Vec<Expr>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Expr::And(parts)
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CatchClause {
    pub ty: String,
    pub name: String,
    pub body: Vec<Stmt>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Stmt {
    Expr(Expr),
    Declare {
        ty: String,
        name: String,
        init: String,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
    },
}

impl Stmt {
    pub fn assign(target: &str, value: Expr) -> Self {
        Stmt::Expr(Expr::assign(target, value))
    }
}

/// Prints statements as Java source, using simple type names.
pub struct JavaPrinter {
    indent_level: usize,
    output: String,
}

impl Default for JavaPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaPrinter {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            output: String::new(),
        }
    }

    pub fn print(&mut self, stmts: &[Stmt]) -> String {
        self.output.clear();
        self.visit_block(stmts);
        self.output.clone()
    }

    pub fn print_expr(&mut self, expr: &Expr) -> String {
        self.output.clear();
        self.visit_expr(expr);
        self.output.clone()
    }

    fn indent(&mut self) {
        self.indent_level += 4;
    }

    fn dedent(&mut self) {
        if self.indent_level >= 4 {
            self.indent_level -= 4;
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push(' ');
        }
    }

    fn visit_block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_braced(&mut self, stmts: &[Stmt]) {
        self.output.push_str("{\n");
        self.indent();
        self.visit_block(stmts);
        self.dedent();
        self.write_indent();
        self.output.push('}');
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.write_indent();
                self.visit_expr(expr);
                self.output.push_str(";\n");
            }
            Stmt::Declare { ty, name, init } => {
                self.write_indent();
                self.output.push_str(&format!("{} {} = {};\n", simple_name(ty), name, init));
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.write_indent();
                self.output.push_str("if (");
                self.visit_expr(cond);
                self.output.push_str(") ");
                self.visit_braced(then_body);
                if !else_body.is_empty() {
                    self.output.push_str(" else ");
                    self.visit_braced(else_body);
                }
                self.output.push('\n');
            }
            Stmt::While { cond, body } => {
                self.write_indent();
                self.output.push_str("while (");
                self.visit_expr(cond);
                self.output.push_str(") ");
                self.visit_braced(body);
                self.output.push('\n');
            }
            Stmt::Try { body, catches } => {
                self.write_indent();
                self.output.push_str("try ");
                self.visit_braced(body);
                for clause in catches {
                    self.output
                        .push_str(&format!(" catch ({} {}) ", simple_name(&clause.ty), clause.name));
                    self.visit_braced(&clause.body);
                }
                self.output.push('\n');
            }
        }
    }

    fn visit_args(&mut self, args: &[Expr]) {
        self.output.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.visit_expr(arg);
        }
        self.output.push(')');
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Var(name) | Expr::Literal(name) => self.output.push_str(name),
            Expr::TypeRef(ty) => self.output.push_str(simple_name(ty)),
            Expr::New { ty, args } => {
                self.output.push_str("new ");
                self.output.push_str(simple_name(ty));
                self.visit_args(args);
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => {
                self.visit_expr(receiver);
                self.output.push('.');
                self.output.push_str(method);
                self.visit_args(args);
            }
            Expr::Lambda { params, result } => {
                self.output.push('(');
                self.output.push_str(&params.join(", "));
                self.output.push_str(") -> ");
                match result {
                    Some(value) => self.output.push_str(value),
                    None => self.output.push_str("{}"),
                }
            }
            Expr::Assign { target, value } => {
                self.output.push_str(target);
                self.output.push_str(" = ");
                self.visit_expr(value);
            }
            Expr::NotEqual { value, literal } => {
                let wrap = matches!(**value, Expr::Assign { .. });
                if wrap {
                    self.output.push('(');
                }
                self.visit_expr(value);
                if wrap {
                    self.output.push(')');
                }
                self.output.push_str(" != ");
                self.output.push_str(literal);
            }
            Expr::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(" && ");
                    }
                    self.visit_expr(part);
                }
            }
        }
    }
}
