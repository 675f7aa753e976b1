//! Set-based evaluation of expression constraints.

use std::collections::HashSet;

use terminus_types::SctId;

use crate::ast::{AttributeName, Constraint, Operator, Refinement, RefinementItem, SetOp};
use crate::EclError;

/// One active relationship of a concept, as the evaluator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEdge {
    /// Relationship type.
    pub type_id: SctId,
    /// Destination concept.
    pub target: SctId,
    /// Role group; 0 means ungrouped.
    pub group: u16,
}

/// The store interface the evaluator runs against.
///
/// Implementations answer from whatever holds the terminology; the
/// evaluator itself never touches storage. All hierarchy methods follow
/// active IS_A edges only, and [`members_of`](Self::members_of) returns
/// the empty set for unknown refsets rather than failing.
pub trait TerminologyProvider {
    /// True if a concept with this id is present.
    fn concept_exists(&self, concept_id: SctId) -> Result<bool, EclError>;

    /// Every concept id, for wildcard expressions.
    fn all_concepts(&self) -> Result<HashSet<SctId>, EclError>;

    /// Immediate IS_A parents.
    fn parents_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError>;

    /// Immediate IS_A children.
    fn children_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError>;

    /// Transitive descendants (strict).
    fn descendants_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError>;

    /// Transitive ancestors (strict).
    fn ancestors_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError>;

    /// Active members of a reference set; empty when unknown.
    fn members_of(&self, refset_id: SctId) -> Result<HashSet<SctId>, EclError>;

    /// Every active relationship whose source is this concept.
    fn attribute_edges(&self, concept_id: SctId) -> Result<Vec<AttributeEdge>, EclError>;

    /// Cheap descendant count, for `AND` ordering.
    fn descendant_count(&self, concept_id: SctId) -> Result<usize, EclError>;

    /// Cheap member count, for `AND` ordering.
    fn member_count(&self, refset_id: SctId) -> Result<usize, EclError>;

    /// Total concept count, the wildcard's cardinality.
    fn concept_count(&self) -> Result<usize, EclError>;
}

/// Evaluates a constraint to its concept-id set.
pub fn evaluate<P: TerminologyProvider + ?Sized>(
    constraint: &Constraint,
    provider: &P,
) -> Result<HashSet<SctId>, EclError> {
    match constraint {
        Constraint::Wildcard => provider.all_concepts(),
        Constraint::Concept(id) => {
            if provider.concept_exists(*id)? {
                Ok(HashSet::from([*id]))
            } else {
                Ok(HashSet::new())
            }
        }
        Constraint::MemberOf(refset_id) => provider.members_of(*refset_id),
        Constraint::Hierarchy(op, inner) => {
            let base = evaluate(inner, provider)?;
            apply_operator(*op, &base, provider)
        }
        Constraint::Refined { focus, refinements } => {
            let focus_set = evaluate(focus, provider)?;
            refine(focus_set, refinements, provider)
        }
        Constraint::Binary { op, left, right } => match op {
            SetOp::And => {
                // Evaluate the cheaper side first; an empty result
                // short-circuits the other side entirely.
                let (first, second) = if estimate(left, provider)? <= estimate(right, provider)? {
                    (left, right)
                } else {
                    (right, left)
                };
                let first_set = evaluate(first, provider)?;
                if first_set.is_empty() {
                    return Ok(first_set);
                }
                let second_set = evaluate(second, provider)?;
                Ok(first_set.intersection(&second_set).copied().collect())
            }
            SetOp::Or => {
                let mut union = evaluate(left, provider)?;
                union.extend(evaluate(right, provider)?);
                Ok(union)
            }
            SetOp::Minus => {
                let left_set = evaluate(left, provider)?;
                if left_set.is_empty() {
                    return Ok(left_set);
                }
                let right_set = evaluate(right, provider)?;
                Ok(left_set.difference(&right_set).copied().collect())
            }
        },
    }
}

fn apply_operator<P: TerminologyProvider + ?Sized>(
    op: Operator,
    base: &HashSet<SctId>,
    provider: &P,
) -> Result<HashSet<SctId>, EclError> {
    let mut result = HashSet::new();
    for &concept_id in base {
        match op {
            Operator::Descendants => result.extend(provider.descendants_of(concept_id)?),
            Operator::DescendantsOrSelf => {
                result.insert(concept_id);
                result.extend(provider.descendants_of(concept_id)?);
            }
            Operator::Ancestors => result.extend(provider.ancestors_of(concept_id)?),
            Operator::AncestorsOrSelf => {
                result.insert(concept_id);
                result.extend(provider.ancestors_of(concept_id)?);
            }
            Operator::Children => result.extend(provider.children_of(concept_id)?),
            Operator::Parents => result.extend(provider.parents_of(concept_id)?),
        }
    }
    Ok(result)
}

/// Filters a focus set down to the concepts satisfying every refinement
/// item. Value constraints evaluate once, not per focus concept.
fn refine<P: TerminologyProvider + ?Sized>(
    focus: HashSet<SctId>,
    refinements: &[RefinementItem],
    provider: &P,
) -> Result<HashSet<SctId>, EclError> {
    enum Resolved {
        Attribute(AttributeName, HashSet<SctId>),
        Group(Vec<(AttributeName, HashSet<SctId>)>),
    }

    let resolve = |refinement: &Refinement| -> Result<(AttributeName, HashSet<SctId>), EclError> {
        Ok((refinement.attribute, evaluate(&refinement.value, provider)?))
    };

    let mut resolved = Vec::with_capacity(refinements.len());
    for item in refinements {
        resolved.push(match item {
            RefinementItem::Attribute(refinement) => {
                let (attribute, values) = resolve(refinement)?;
                Resolved::Attribute(attribute, values)
            }
            RefinementItem::Group(group) => Resolved::Group(
                group
                    .iter()
                    .map(resolve)
                    .collect::<Result<Vec<_>, EclError>>()?,
            ),
        });
    }

    let mut out = HashSet::new();
    'concepts: for concept_id in focus {
        let edges = provider.attribute_edges(concept_id)?;
        for item in &resolved {
            let holds = match item {
                Resolved::Attribute(attribute, values) => edges
                    .iter()
                    .any(|edge| attribute_matches(*attribute, edge) && values.contains(&edge.target)),
                Resolved::Group(members) => group_matches(&edges, members),
            };
            if !holds {
                continue 'concepts;
            }
        }
        out.insert(concept_id);
    }
    Ok(out)
}

fn attribute_matches(attribute: AttributeName, edge: &AttributeEdge) -> bool {
    match attribute {
        AttributeName::Any => true,
        AttributeName::Type(type_id) => edge.type_id == type_id,
    }
}

/// A grouped refinement holds when some nonzero role group satisfies
/// every member.
fn group_matches(edges: &[AttributeEdge], members: &[(AttributeName, HashSet<SctId>)]) -> bool {
    let groups: HashSet<u16> = edges.iter().filter(|e| e.group > 0).map(|e| e.group).collect();
    groups.into_iter().any(|group| {
        members.iter().all(|(attribute, values)| {
            edges.iter().any(|edge| {
                edge.group == group
                    && attribute_matches(*attribute, edge)
                    && values.contains(&edge.target)
            })
        })
    })
}

/// Cheap cardinality estimate used to order `AND` operands.
fn estimate<P: TerminologyProvider + ?Sized>(
    constraint: &Constraint,
    provider: &P,
) -> Result<usize, EclError> {
    Ok(match constraint {
        Constraint::Wildcard => provider.concept_count()?,
        Constraint::Concept(_) => 1,
        Constraint::MemberOf(refset_id) => provider.member_count(*refset_id)?,
        Constraint::Hierarchy(op, inner) => match (op, inner.as_ref()) {
            (Operator::Descendants, Constraint::Concept(id)) => provider.descendant_count(*id)?,
            (Operator::DescendantsOrSelf, Constraint::Concept(id)) => {
                provider.descendant_count(*id)? + 1
            }
            (Operator::Children | Operator::Parents, _) => estimate(inner, provider)?,
            _ => provider.concept_count()?,
        },
        Constraint::Refined { focus, .. } => estimate(focus, provider)?,
        Constraint::Binary { op, left, right } => {
            let l = estimate(left, provider)?;
            let r = estimate(right, provider)?;
            match op {
                SetOp::And => l.min(r),
                SetOp::Or => l.saturating_add(r),
                SetOp::Minus => l,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use std::collections::HashMap;
    use terminus_types::well_known;

    /// In-memory provider over a small hierarchy:
    ///
    /// ```text
    /// 100 Clinical finding
    ///  └── 200 Disorder          (in refset R1)
    ///       └── 300 Infection    (in refset R1)
    /// 900, 901 carry grouped attribute edges for refinement tests.
    /// ```
    #[derive(Default)]
    struct MockProvider {
        concepts: HashSet<SctId>,
        parents: HashMap<SctId, HashSet<SctId>>,
        refsets: HashMap<SctId, HashSet<SctId>>,
        edges: HashMap<SctId, Vec<AttributeEdge>>,
    }

    const R1: SctId = 900001;
    const FINDING_SITE: SctId = well_known::FINDING_SITE;
    const CAUSATIVE_AGENT: SctId = well_known::CAUSATIVE_AGENT;

    impl MockProvider {
        fn fixture() -> Self {
            let mut provider = MockProvider::default();
            for id in [100, 200, 300, 801, 802, 900, 901] {
                provider.concepts.insert(id);
            }
            provider.add_is_a(200, 100);
            provider.add_is_a(300, 200);
            provider.refsets.insert(R1, HashSet::from([200, 300]));
            provider.edges.entry(900).or_default().extend([
                AttributeEdge { type_id: FINDING_SITE, target: 801, group: 1 },
                AttributeEdge { type_id: CAUSATIVE_AGENT, target: 802, group: 1 },
            ]);
            provider.edges.entry(901).or_default().extend([
                AttributeEdge { type_id: FINDING_SITE, target: 801, group: 1 },
                AttributeEdge { type_id: CAUSATIVE_AGENT, target: 802, group: 2 },
            ]);
            provider
        }

        fn add_is_a(&mut self, child: SctId, parent: SctId) {
            self.parents.entry(child).or_default().insert(parent);
            self.edges.entry(child).or_default().push(AttributeEdge {
                type_id: well_known::IS_A,
                target: parent,
                group: 0,
            });
        }

        fn eval(&self, expression: &str) -> HashSet<SctId> {
            evaluate(&parse(expression).unwrap(), self).unwrap()
        }
    }

    impl TerminologyProvider for MockProvider {
        fn concept_exists(&self, concept_id: SctId) -> Result<bool, EclError> {
            Ok(self.concepts.contains(&concept_id))
        }

        fn all_concepts(&self) -> Result<HashSet<SctId>, EclError> {
            Ok(self.concepts.clone())
        }

        fn parents_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError> {
            Ok(self.parents.get(&concept_id).cloned().unwrap_or_default())
        }

        fn children_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError> {
            Ok(self
                .parents
                .iter()
                .filter(|(_, parents)| parents.contains(&concept_id))
                .map(|(child, _)| *child)
                .collect())
        }

        fn descendants_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError> {
            let mut out = HashSet::new();
            let mut queue: Vec<SctId> = self.children_of(concept_id)?.into_iter().collect();
            while let Some(current) = queue.pop() {
                if out.insert(current) {
                    queue.extend(self.children_of(current)?);
                }
            }
            Ok(out)
        }

        fn ancestors_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError> {
            let mut out = HashSet::new();
            let mut queue: Vec<SctId> = self.parents_of(concept_id)?.into_iter().collect();
            while let Some(current) = queue.pop() {
                if out.insert(current) {
                    queue.extend(self.parents_of(current)?);
                }
            }
            Ok(out)
        }

        fn members_of(&self, refset_id: SctId) -> Result<HashSet<SctId>, EclError> {
            Ok(self.refsets.get(&refset_id).cloned().unwrap_or_default())
        }

        fn attribute_edges(&self, concept_id: SctId) -> Result<Vec<AttributeEdge>, EclError> {
            Ok(self.edges.get(&concept_id).cloned().unwrap_or_default())
        }

        fn descendant_count(&self, concept_id: SctId) -> Result<usize, EclError> {
            Ok(self.descendants_of(concept_id)?.len())
        }

        fn member_count(&self, refset_id: SctId) -> Result<usize, EclError> {
            Ok(self.members_of(refset_id)?.len())
        }

        fn concept_count(&self) -> Result<usize, EclError> {
            Ok(self.concepts.len())
        }
    }

    #[test]
    fn hierarchy_operators() {
        let provider = MockProvider::fixture();
        assert_eq!(provider.eval("100"), HashSet::from([100]));
        assert_eq!(provider.eval("< 100"), HashSet::from([200, 300]));
        assert_eq!(provider.eval("<< 100"), HashSet::from([100, 200, 300]));
        assert_eq!(provider.eval("<< 300"), HashSet::from([300]));
        assert_eq!(provider.eval("> 300"), HashSet::from([100, 200]));
        assert_eq!(provider.eval(">> 300"), HashSet::from([100, 200, 300]));
        assert_eq!(provider.eval("<! 100"), HashSet::from([200]));
        assert_eq!(provider.eval(">! 300"), HashSet::from([200]));
    }

    #[test]
    fn descendants_or_self_equals_self_union_descendants() {
        let provider = MockProvider::fixture();
        let or_self = provider.eval("<< 200");
        let strict: HashSet<SctId> = provider.eval("< 200");
        let mut expected = strict.clone();
        expected.insert(200);
        assert_eq!(or_self, expected);
    }

    #[test]
    fn set_algebra_identities() {
        let provider = MockProvider::fixture();
        assert_eq!(provider.eval("<< 200 AND ^ 900001"), HashSet::from([200, 300]));
        assert_eq!(provider.eval("<< 200 MINUS ^ 900001"), HashSet::new());
        assert_eq!(
            provider.eval("<< 100 MINUS << 200"),
            HashSet::from([100])
        );
        assert_eq!(
            provider.eval("300 OR 100"),
            HashSet::from([100, 300])
        );
        // AND/OR/MINUS against the evaluated parts.
        let a = provider.eval("<< 100");
        let b = provider.eval("^ 900001");
        assert_eq!(
            provider.eval("<< 100 AND ^ 900001"),
            a.intersection(&b).copied().collect::<HashSet<_>>()
        );
    }

    #[test]
    fn refset_membership() {
        let provider = MockProvider::fixture();
        assert_eq!(provider.eval("^ 900001"), HashSet::from([200, 300]));
        // Unknown refsets are empty, not an error.
        assert_eq!(provider.eval("^ 424242"), HashSet::new());
    }

    #[test]
    fn wildcard_covers_all_concepts() {
        let provider = MockProvider::fixture();
        assert_eq!(provider.eval("*"), provider.concepts.clone());
        assert_eq!(provider.eval("* AND ^ 900001"), HashSet::from([200, 300]));
    }

    #[test]
    fn unknown_focus_concept_is_empty() {
        let provider = MockProvider::fixture();
        assert_eq!(provider.eval("424242"), HashSet::new());
        assert_eq!(provider.eval("<< 424242"), HashSet::new());
    }

    #[test]
    fn refinement_selects_sources_by_attribute() {
        let provider = MockProvider::fixture();
        // IS_A refinements count as attributes too.
        assert_eq!(
            provider.eval("< 100 : 116680003 = 200"),
            HashSet::from([300])
        );
        assert_eq!(
            provider.eval("* : 363698007 = 801"),
            HashSet::from([900, 901])
        );
        // The value position takes a full constraint.
        assert_eq!(
            provider.eval("* : 363698007 = (801 OR 802)"),
            HashSet::from([900, 901])
        );
        // Wildcard attribute.
        assert_eq!(
            provider.eval("* : * = 802"),
            HashSet::from([900, 901])
        );
        // No match.
        assert_eq!(provider.eval("* : 363698007 = 999"), HashSet::new());
    }

    #[test]
    fn grouped_refinements_require_one_shared_group() {
        let provider = MockProvider::fixture();
        // 900 carries both attributes in group 1; 901 splits them.
        assert_eq!(
            provider.eval("* : { 363698007 = 801, 246075003 = 802 }"),
            HashSet::from([900])
        );
        // Ungrouped, both concepts qualify.
        assert_eq!(
            provider.eval("* : 363698007 = 801, 246075003 = 802"),
            HashSet::from([900, 901])
        );
    }
}
