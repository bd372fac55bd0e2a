use std::rc::Rc;
use strum_macros::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "++")]
    Combine,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "|")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FlowDirection {
    #[strum(serialize = "=>")]
    Forward,
    #[strum(serialize = "<=")]
    Backward,
    #[strum(serialize = "<>")]
    Both,
    #[strum(serialize = "@>")]
    Channel,
    #[strum(serialize = "<@")]
    ChannelReverse,
    #[strum(serialize = "++>")]
    Increment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Else,
    Expression(Node),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateBranch {
    pub pattern: Pattern,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program(Vec<Node>),
    Literal(Literal),
    Identifier(String),
    BinaryOp {
        left: Box<Node>,
        operator: BinaryOperator,
        right: Box<Node>,
    },
    PoolLiteral(Vec<Node>),
    KeyedPoolLiteral(Vec<(String, Node)>),
    VarDeclaration {
        mutable: bool,
        name: String,
        value: Option<Box<Node>>,
    },
    Assignment {
        target: Box<Node>,
        value: Box<Node>,
    },
    ContextDef {
        name: String,
        inputs: Vec<String>,
        outputs: Vec<String>,
        body: Rc<Vec<Node>>,
    },
    ReactionDef {
        name: String,
        condition: Option<Box<Node>>,
        body: Vec<Node>,
    },
    GateDef {
        condition: Box<Node>,
        branches: Vec<GateBranch>,
    },
    /// `right` is `None` only for `++>`, which is postfix.
    Flow {
        left: Box<Node>,
        direction: FlowDirection,
        right: Option<Box<Node>>,
    },
}

pub trait Visitor<T, Output> {
    fn visit(&mut self, n: &T) -> Output;
}

impl Node {
    pub fn accept<T>(&self, v: &mut dyn Visitor<Node, T>) -> T {
        v.visit(self)
    }
}

/// Renders a tree as s-expressions, e.g. `(=> (* n 2) r)`.
pub struct AstPrinter {}

impl AstPrinter {
    fn parenthesize(&mut self, name: &str, args: &[&Node]) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push_str(" ");
            x.push_str(arg.accept(self).as_str());
        }
        x.push_str(")");
        x
    }
    fn block(&mut self, head: String, body: &[Node]) -> String {
        let parts: Vec<&Node> = body.iter().collect();
        self.parenthesize(&head, &parts)
    }
}

impl Visitor<Node, String> for AstPrinter {
    fn visit(&mut self, n: &Node) -> String {
        match n {
            Node::Program(statements) => self.block("program".to_string(), statements),
            Node::Literal(x) => match x {
                Literal::Integer(y) => y.to_string(),
                Literal::Float(y) => format!("{:?}", y),
                Literal::String(y) => format!("{:?}", y),
                Literal::Boolean(y) => y.to_string(),
                Literal::Null => "null".to_string(),
            },
            Node::Identifier(name) => name.clone(),
            Node::BinaryOp {
                left,
                operator,
                right,
            } => self.parenthesize(&operator.to_string(), &[left.as_ref(), right.as_ref()]),
            Node::PoolLiteral(elements) => self.block("pool".to_string(), elements),
            Node::KeyedPoolLiteral(pairs) => {
                let mut x = String::from("(keyed");
                for (key, value) in pairs {
                    x.push_str(&format!(" ({} {})", key, value.accept(self)));
                }
                x.push_str(")");
                x
            }
            Node::VarDeclaration {
                mutable,
                name,
                value,
            } => {
                let marker = if *mutable { "@var" } else { "#var" };
                match value {
                    Some(value) => format!("({} {} {})", marker, name, value.accept(self)),
                    None => format!("({} {})", marker, name),
                }
            }
            Node::Assignment { target, value } => {
                self.parenthesize("=", &[target.as_ref(), value.as_ref()])
            }
            Node::ContextDef {
                name,
                inputs,
                outputs,
                body,
            } => {
                let head = format!(
                    "context {} (in{}) (out{})",
                    name,
                    inputs.iter().map(|i| format!(" {}", i)).collect::<String>(),
                    outputs.iter().map(|o| format!(" {}", o)).collect::<String>()
                );
                self.block(head, body)
            }
            Node::ReactionDef {
                name,
                condition,
                body,
            } => {
                let head = match condition {
                    Some(condition) => format!("reaction {} {}", name, condition.accept(self)),
                    None => format!("reaction {}", name),
                };
                self.block(head, body)
            }
            Node::GateDef {
                condition,
                branches,
            } => {
                let mut x = format!("(gate {}", condition.accept(self));
                for branch in branches {
                    let head = match &branch.pattern {
                        Pattern::Else => "else".to_string(),
                        Pattern::Expression(pattern) => pattern.accept(self),
                    };
                    x.push_str(" ");
                    x.push_str(&self.block(head, &branch.body));
                }
                x.push_str(")");
                x
            }
            Node::Flow {
                left,
                direction,
                right,
            } => match right {
                Some(right) => {
                    self.parenthesize(&direction.to_string(), &[left.as_ref(), right.as_ref()])
                }
                None => self.parenthesize(&direction.to_string(), &[left.as_ref()]),
            },
        }
    }
}
