use core::fmt;

use crate::{
    ast::{CatchClause, JavaPrinter, Stmt},
    environment::Environment,
    graph::order_subtypes_first,
    schema::default_value,
};

/// The synthesized code for one hole.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RenderedBody {
    pub imports: Vec<String>,
    pub body: String,
    pub statements: Vec<Stmt>,
}

impl RenderedBody {
    /// The body with all whitespace runs collapsed, for deduplication.
    pub fn normalized(&self) -> String {
        self.body.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for RenderedBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for import in &self.imports {
            writeln!(f, "import {};", import)?;
        }
        if !self.imports.is_empty() {
            writeln!(f)?;
        }
        write!(f, "{}", self.body)
    }
}

/// Finish an emitted body: exceptions nobody caught are swallowed by one
/// trailing try/catch, declarations of synthesized variables go first, and
/// the import list is collected.
pub fn postprocess(body: Vec<Stmt>, env: &mut Environment) -> RenderedBody {
    let outstanding = order_subtypes_first(env.catalog(), env.outstanding_exceptions());
    let body = if outstanding.is_empty() {
        body
    } else {
        log::debug!("wrapping uncaught {:?}", outstanding);
        let catches = outstanding
            .into_iter()
            .map(|ty| {
                env.require_import(&ty);
                CatchClause {
                    name: env.reserve_name(&ty),
                    ty,
                    body: Vec::new(),
                }
            })
            .collect();
        vec![Stmt::Try { body, catches }]
    };

    let mut statements: Vec<Stmt> = env
        .declared_variables()
        .iter()
        .map(|v| Stmt::Declare {
            ty: v.ty.clone(),
            name: v.name.clone(),
            init: default_value(&v.ty).to_string(),
        })
        .collect();
    statements.extend(body);

    RenderedBody {
        imports: env.imports(),
        body: JavaPrinter::new().print(&statements),
        statements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::Expr, graph::tests::jdk, schema::Hole};

    #[test]
    fn hoists_and_wraps() {
        let cat = jdk();
        let mut env = Environment::new(&cat, &Hole::new(&[("w", "java.io.Writer")]));
        let n = env.add_variable("int");
        env.record_exception_thrown("java.io.IOException");
        let body = vec![Stmt::Expr(Expr::call(Expr::var("w"), "flush", vec![])), Stmt::assign(&n, Expr::Literal("1".into()))];
        let rendered = postprocess(body, &mut env);
        let expected = "\
int i = 0;
try {
    w.flush();
    i = 1;
} catch (IOException ioe) {
}
";
        assert_eq!(rendered.body, expected);
        assert_eq!(rendered.imports, vec!["java.io.IOException"]);
        assert_eq!(
            rendered.to_string(),
            format!("import java.io.IOException;\n\n{}", expected)
        );
    }

    #[test]
    fn nothing_outstanding_means_no_wrapper() {
        let cat = jdk();
        let mut env = Environment::new(&cat, &Hole::default());
        let rendered = postprocess(vec![Stmt::Expr(Expr::var("x"))], &mut env);
        assert_eq!(rendered.body, "x;\n");
        assert!(rendered.imports.is_empty());
        assert_eq!(rendered.normalized(), "x;");
    }
}
