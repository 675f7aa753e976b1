//! The expression-constraint AST.

use terminus_types::SctId;

/// Hierarchy operators prefixing a focus expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `<` strict descendants.
    Descendants,
    /// `<<` descendants or self.
    DescendantsOrSelf,
    /// `>` strict ancestors.
    Ancestors,
    /// `>>` ancestors or self.
    AncestorsOrSelf,
    /// `<!` immediate children.
    Children,
    /// `>!` immediate parents.
    Parents,
}

/// Set-algebra operators between subexpressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    /// Intersection.
    And,
    /// Union.
    Or,
    /// Set difference.
    Minus,
}

/// The attribute position of a refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeName {
    /// `*`: any relationship type.
    Any,
    /// A specific relationship type.
    Type(SctId),
}

/// One `attribute = value` refinement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refinement {
    /// The relationship type to match.
    pub attribute: AttributeName,
    /// The constraint the destination must satisfy.
    pub value: Constraint,
}

/// A refinement-list entry: a lone attribute, or a brace-delimited group
/// whose attributes must all match edges sharing one role group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefinementItem {
    /// Ungrouped: any active edge of the concept may satisfy it.
    Attribute(Refinement),
    /// Grouped: every member must be satisfied by edges carrying the same
    /// nonzero role group.
    Group(Vec<Refinement>),
}

/// A parsed expression constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `*`: every concept.
    Wildcard,
    /// A focus concept, evaluating to itself.
    Concept(SctId),
    /// `^refset`: the active members of a reference set.
    MemberOf(SctId),
    /// A hierarchy operator applied to a subexpression.
    Hierarchy(Operator, Box<Constraint>),
    /// A focus constrained by refinements.
    Refined {
        /// The focus expression.
        focus: Box<Constraint>,
        /// The refinement list; every item must hold.
        refinements: Vec<RefinementItem>,
    },
    /// Set algebra over two subexpressions.
    Binary {
        /// The operator.
        op: SetOp,
        /// Left operand.
        left: Box<Constraint>,
        /// Right operand.
        right: Box<Constraint>,
    },
}
