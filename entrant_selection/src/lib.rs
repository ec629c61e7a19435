pub mod builder;
mod config;
pub mod identity;
pub mod manual;

use log::{debug, info, warn};
use rand::Rng;

use std::collections::HashSet;

pub use crate::config::*;
use crate::identity::IdentityMatcher;

/// Runs the draw with the given rules over the given roster.
///
/// Arguments:
/// * `roster` the respondents, in the order of the form (or of a previously persisted remainder)
/// * `members` the membership registry, all membership types included
/// * `rules` the number of places, the pre-approved entrants and the eligibility questions
/// * `rng` the source of randomness. Pass a seeded generator for a reproducible draw.
///
/// The pre-approved entrants take places without being drawn: the draw only
/// fills what is left. When there are not enough eligible respondents, every
/// one of them is selected and the result is smaller than requested.
pub fn select<R: Rng + ?Sized>(
    roster: &[RespondentRecord],
    members: &[MembershipRecord],
    rules: &SelectionRules,
    rng: &mut R,
) -> Result<SelectionResult, SelectionErrors> {
    info!(
        "select: processing {:?} respondents, {:?} membership records, rules: {:?}",
        roster.len(),
        members.len(),
        rules
    );
    check_roster(roster, rules)?;

    let mut stats = SelectionStats {
        roster_size: roster.len(),
        ..SelectionStats::default()
    };

    let unique = dedupe(roster);
    stats.duplicates = roster.len() - unique.len();

    let pre_approved = pre_approved_set(&rules.pre_approved);
    let matcher = IdentityMatcher::new(members, &rules.active_membership_type);
    let pool: Vec<&RespondentRecord> = unique
        .into_iter()
        .filter(|r| is_eligible(r, rules, &pre_approved, &matcher, &mut stats))
        .collect();
    stats.eligible = pool.len();

    {
        let found: HashSet<&str> = roster.iter().map(|r| r.name.trim()).collect();
        for name in pre_approved.iter() {
            if !found.contains(name) {
                warn!("select: pre-approved entrant {:?} is not in the roster", name);
            }
        }
    }

    let quota = compute_quota(rules.requested_count, pre_approved.len(), pool.len());
    info!(
        "select: {} eligible, {} pre-approved, {} places requested -> drawing {}",
        pool.len(),
        pre_approved.len(),
        rules.requested_count,
        quota
    );
    if (quota as i64) < (rules.requested_count as i64) - (pre_approved.len() as i64) {
        warn!(
            "select: only {} eligible respondents for {} open places",
            pool.len(),
            rules.requested_count as usize - pre_approved.len()
        );
    }

    let drawn: Vec<usize> = sample_indices(rng, pool.len(), quota);
    debug!("select: drawn positions: {:?}", drawn);

    let drawn_set: HashSet<usize> = drawn.iter().cloned().collect();
    let selected: Vec<RespondentRecord> = drawn.iter().map(|idx| pool[*idx].clone()).collect();
    let remaining: Vec<RespondentRecord> = pool
        .iter()
        .enumerate()
        .filter(|(idx, _)| !drawn_set.contains(idx))
        .map(|(_, r)| (*r).clone())
        .collect();

    info!("select: stats: {:?}", stats);
    for r in selected.iter() {
        info!("select: selected {} <{}>", r.name, r.email);
    }

    Ok(SelectionResult {
        selected,
        remaining,
        quota,
        stats,
    })
}

/// The number of entrants to draw.
///
/// `requested_count - num_pre_approved`, capped by the size of the pool, and
/// never negative.
pub fn compute_quota(requested_count: u32, num_pre_approved: usize, pool_size: usize) -> usize {
    let open = requested_count as i64 - num_pre_approved as i64;
    open.min(pool_size as i64).max(0) as usize
}

/// Draws `amount` distinct positions out of `0..length`, each position being
/// equally likely. The positions are returned in draw order.
fn sample_indices<R: Rng + ?Sized>(rng: &mut R, length: usize, amount: usize) -> Vec<usize> {
    if amount == 0 {
        return Vec::new();
    }
    rand::seq::index::sample(rng, length, amount.min(length)).into_vec()
}

fn check_roster(
    roster: &[RespondentRecord],
    rules: &SelectionRules,
) -> Result<(), SelectionErrors> {
    let expected = rules.eligibility_questions.len();
    for (position, r) in roster.iter().enumerate() {
        if normalize_email(&r.email).is_empty() {
            return Err(SelectionErrors::EmptyEmail { position });
        }
        if r.answers.len() != expected {
            return Err(SelectionErrors::AnswerCountMismatch {
                email: r.email.clone(),
                expected,
                found: r.answers.len(),
            });
        }
    }
    Ok(())
}

// The first occurrence of each email wins. The order of the roster is kept.
fn dedupe(roster: &[RespondentRecord]) -> Vec<&RespondentRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<&RespondentRecord> = Vec::new();
    for r in roster.iter() {
        if seen.insert(normalize_email(&r.email)) {
            res.push(r);
        } else {
            debug!("dedupe: dropping duplicate entry for {:?}", r.email);
        }
    }
    res
}

fn pre_approved_set(names: &[String]) -> HashSet<&str> {
    names
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_eligible(
    r: &RespondentRecord,
    rules: &SelectionRules,
    pre_approved: &HashSet<&str>,
    matcher: &IdentityMatcher,
    stats: &mut SelectionStats,
) -> bool {
    if !r.answers.iter().all(|a| *a == rules.accepted_answer) {
        debug!("is_eligible: {:?}: answers {:?}", r.email, r.answers);
        stats.failed_questions += 1;
        return false;
    }
    if pre_approved.contains(r.name.trim()) {
        debug!("is_eligible: {:?}: pre-approved", r.email);
        stats.pre_approved += 1;
        return false;
    }
    match matcher.match_strategy(r) {
        Some(strategy) => {
            debug!("is_eligible: {:?}: member by {:?}", r.email, strategy);
            true
        }
        None => {
            debug!("is_eligible: {:?}: not an active member", r.email);
            stats.non_members += 1;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn rules(requested_count: u32, pre_approved: &[&str]) -> SelectionRules {
        let mut r = SelectionRules::new(requested_count);
        r.pre_approved = pre_approved.iter().map(|s| s.to_string()).collect();
        r.eligibility_questions = vec!["Available?".to_string(), "Agree to terms?".to_string()];
        r
    }

    fn yes() -> Vec<String> {
        vec!["Yes".to_string(), "Yes".to_string()]
    }

    fn respondent(email: &str, name: &str) -> RespondentRecord {
        RespondentRecord::new(email, name, &yes())
    }

    fn member(email: &str, name: &str) -> MembershipRecord {
        MembershipRecord {
            email: email.to_string(),
            name: name.to_string(),
            membership_type: "Standard".to_string(),
        }
    }

    // Respondents r0..rn, all registered members.
    fn population(n: usize) -> (Vec<RespondentRecord>, Vec<MembershipRecord>) {
        let roster = (0..n)
            .map(|i| {
                respondent(
                    &format!("r{}@ucl.ac.uk", i),
                    &format!("Person Number{}", i),
                )
            })
            .collect();
        let members = (0..n)
            .map(|i| member(&format!("r{}@ucl.ac.uk", i), &format!("Person Number{}", i)))
            .collect();
        (roster, members)
    }

    fn emails(rs: &[RespondentRecord]) -> HashSet<String> {
        rs.iter().map(|r| r.email.clone()).collect()
    }

    #[test]
    fn five_eligible_three_requested() {
        init();
        let (roster, members) = population(5);
        let mut rng = StdRng::seed_from_u64(7);
        let res = select(&roster, &members, &rules(3, &[]), &mut rng).unwrap();
        assert_eq!(res.quota, 3);
        assert_eq!(res.selected.len(), 3);
        assert_eq!(emails(&res.selected).len(), 3);
        assert_eq!(res.remaining.len(), 2);
        assert!(emails(&res.selected).is_disjoint(&emails(&res.remaining)));
    }

    #[test]
    fn pre_approved_take_places() {
        init();
        let (mut roster, mut members) = population(4);
        roster.insert(0, respondent("alice.smith@ucl.ac.uk", "Alice Smith"));
        members.push(member("alice.smith@ucl.ac.uk", "Alice Smith"));
        let mut rng = StdRng::seed_from_u64(11);
        let res = select(&roster, &members, &rules(2, &["Alice Smith"]), &mut rng).unwrap();
        assert_eq!(res.stats.eligible, 4);
        assert_eq!(res.stats.pre_approved, 1);
        assert_eq!(res.quota, 1);
        assert_eq!(res.selected.len(), 1);
        assert_eq!(res.remaining.len(), 3);
        assert!(res
            .selected
            .iter()
            .chain(res.remaining.iter())
            .all(|r| r.name != "Alice Smith"));
    }

    #[test]
    fn more_pre_approved_than_places() {
        init();
        let (roster, members) = population(4);
        let mut rng = StdRng::seed_from_u64(3);
        let res = select(
            &roster,
            &members,
            &rules(1, &["Alice Smith", "Bob Jones", "Carol King"]),
            &mut rng,
        )
        .unwrap();
        assert_eq!(res.quota, 0);
        assert!(res.selected.is_empty());
        assert_eq!(res.remaining.len(), 4);
    }

    #[test]
    fn undersupplied_pool_is_fully_selected() {
        init();
        let (roster, members) = population(2);
        let mut rng = StdRng::seed_from_u64(5);
        let res = select(&roster, &members, &rules(10, &[]), &mut rng).unwrap();
        assert_eq!(res.quota, 2);
        assert_eq!(emails(&res.selected), emails(&roster));
        assert!(res.remaining.is_empty());
    }

    #[test]
    fn quota_formula() {
        assert_eq!(compute_quota(3, 0, 5), 3);
        assert_eq!(compute_quota(2, 1, 4), 1);
        assert_eq!(compute_quota(1, 3, 4), 0);
        assert_eq!(compute_quota(10, 2, 4), 4);
        assert_eq!(compute_quota(0, 0, 0), 0);
    }

    #[test]
    fn selection_sizes_and_disjointness() {
        init();
        for pool_size in 0..7 {
            let (roster, members) = population(pool_size);
            for requested in 0..9u32 {
                for num_pre in 0..3usize {
                    let pre: Vec<String> = (0..num_pre).map(|i| format!("Guest {}", i)).collect();
                    let mut r = rules(requested, &[]);
                    r.pre_approved = pre;
                    let mut rng = StdRng::seed_from_u64(requested as u64 * 31 + num_pre as u64);
                    let res = select(&roster, &members, &r, &mut rng).unwrap();
                    let expected = (requested as i64 - num_pre as i64)
                        .min(pool_size as i64)
                        .max(0) as usize;
                    assert_eq!(res.selected.len(), expected);
                    let sel = emails(&res.selected);
                    let rem = emails(&res.remaining);
                    assert_eq!(sel.len(), res.selected.len());
                    assert!(sel.is_disjoint(&rem));
                    let pool = emails(&roster);
                    assert!(sel.is_subset(&pool) && rem.is_subset(&pool));
                    assert_eq!(sel.len() + rem.len(), pool.len());
                }
            }
        }
    }

    #[test]
    fn drawing_from_remainder_never_reselects() {
        init();
        let (roster, members) = population(9);
        let r = rules(3, &[]);
        let mut rng = StdRng::seed_from_u64(2022);
        let first = select(&roster, &members, &r, &mut rng).unwrap();
        let second = select(&first.remaining, &members, &r, &mut rng).unwrap();
        let third = select(&second.remaining, &members, &r, &mut rng).unwrap();
        assert!(emails(&first.selected).is_disjoint(&emails(&second.selected)));
        assert!(emails(&first.selected).is_disjoint(&emails(&third.selected)));
        assert!(emails(&second.selected).is_disjoint(&emails(&third.selected)));
        assert_eq!(third.selected.len(), 3);
        assert!(third.remaining.is_empty());
    }

    #[test]
    fn remainder_keeps_roster_order() {
        init();
        let (roster, members) = population(6);
        let mut rng = StdRng::seed_from_u64(1);
        let res = select(&roster, &members, &rules(2, &[]), &mut rng).unwrap();
        let positions: Vec<usize> = res
            .remaining
            .iter()
            .map(|r| roster.iter().position(|x| x == r).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn same_seed_same_draw() {
        let (roster, members) = population(20);
        let r = rules(5, &[]);
        let a = select(&roster, &members, &r, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = select(&roster, &members, &r, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn filters_answers_members_and_duplicates() {
        init();
        let roster = vec![
            respondent("jane.doe@ucl.ac.uk", "Jane Q. Doe"),
            // Duplicate email: the first occurrence is kept.
            RespondentRecord::new(
                " JANE.DOE@ucl.ac.uk",
                "Jane Doe",
                &["No".to_string(), "No".to_string()],
            ),
            RespondentRecord::new(
                "tom.ray@ucl.ac.uk",
                "Tom Ray",
                &["Yes".to_string(), "No".to_string()],
            ),
            respondent("sam.lee@ucl.ac.uk", "Sam Lee"),
            respondent("not.member@ucl.ac.uk", "Not Member"),
        ];
        let members = vec![
            member("jane.doe@x.org", "J Doe"),
            member("tom.ray@ucl.ac.uk", "Tom Ray"),
            member("sl@ucl.ac.uk", "Samuel Lee"),
            MembershipRecord {
                email: "sam.lee@ucl.ac.uk".to_string(),
                name: "Sam Lee".to_string(),
                membership_type: "Associate".to_string(),
            },
        ];
        let mut rng = StdRng::seed_from_u64(0);
        let res = select(&roster, &members, &rules(5, &[]), &mut rng).unwrap();
        assert_eq!(res.stats.roster_size, 5);
        assert_eq!(res.stats.duplicates, 1);
        assert_eq!(res.stats.failed_questions, 1);
        assert_eq!(res.stats.non_members, 2);
        assert_eq!(res.stats.eligible, 1);
        assert_eq!(res.selected.len(), 1);
        assert_eq!(res.selected[0].name, "Jane Q. Doe");
    }

    #[test]
    fn malformed_roster_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let bad_answers = vec![RespondentRecord::new("a.b@x.org", "A B", &["Yes".to_string()])];
        assert!(matches!(
            select(&bad_answers, &[], &rules(1, &[]), &mut rng),
            Err(SelectionErrors::AnswerCountMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
        let no_email = vec![respondent("a.b@x.org", "A B"), respondent("  ", "C D")];
        assert_eq!(
            select(&no_email, &[], &rules(1, &[]), &mut rng),
            Err(SelectionErrors::EmptyEmail { position: 1 })
        );
    }
}
