/*!
 * # Wildcard Matcher
 *
 * Decides whether a required dot-path permission (for example
 * `inventory.products.read`) is satisfied by a single granted pattern that may
 * contain `*` segments (for example `inventory.*`).
 *
 * Matching works per segment, never per character:
 *
 * - a concrete segment matches only an identical segment (empty segments are
 *   ordinary tokens and match only another empty segment)
 * - a `*` segment matches any run of required segments, including an empty run
 *
 * The walk uses two cursors and remembers the most recent wildcard. When a
 * concrete segment fails to match, that wildcard is extended by one more
 * required segment and pattern matching resumes right after it.
 */

/// Segment separator for permission strings and patterns.
pub const SEGMENT_SEPARATOR: char = '.';

/// Token that matches any run of segments inside a granted pattern.
pub const WILDCARD_SEGMENT: &str = "*";

/// Check whether `required` is satisfied by the granted `pattern`.
///
/// Pure function of its two inputs. Runs in `O(r * p)` worst case over the
/// segment counts and allocates only the two segment vectors.
///
/// ```
/// use bale_access::auth::matches_wildcard;
///
/// assert!(matches_wildcard("inventory.products.read", "inventory.*"));
/// assert!(matches_wildcard("inventory.products.read", "inventory.*.read"));
/// assert!(!matches_wildcard("inventory.products.read", "inventory.*.update"));
/// assert!(!matches_wildcard("inventory.products.read", "inventory.products"));
/// ```
pub fn matches_wildcard(required: &str, pattern: &str) -> bool {
    let required: Vec<&str> = required.split(SEGMENT_SEPARATOR).collect();
    let pattern: Vec<&str> = pattern.split(SEGMENT_SEPARATOR).collect();

    let mut req_idx = 0;
    let mut pat_idx = 0;
    // (pattern index of the wildcard, first required index it has not swallowed)
    let mut last_star: Option<(usize, usize)> = None;

    while req_idx < required.len() {
        match pattern.get(pat_idx) {
            Some(&segment) if segment == WILDCARD_SEGMENT => {
                last_star = Some((pat_idx, req_idx));
                pat_idx += 1;
            }
            Some(&segment) if segment == required[req_idx] => {
                req_idx += 1;
                pat_idx += 1;
            }
            _ => match last_star {
                Some((star_pat, star_req)) => {
                    let star_req = star_req + 1;
                    last_star = Some((star_pat, star_req));
                    req_idx = star_req;
                    pat_idx = star_pat + 1;
                }
                None => return false,
            },
        }
    }

    // Leftover pattern segments are only acceptable when they are all wildcards.
    pattern[pat_idx..]
        .iter()
        .all(|segment| *segment == WILDCARD_SEGMENT)
}

/// Returns true when the pattern carries at least one `*` character and is
/// therefore worth running through [`matches_wildcard`].
pub(crate) fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*')
}
