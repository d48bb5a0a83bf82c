use std::cmp::Ordering;

/// Which input an element of a merge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Both,
}

/// Walk two ascending slices in lockstep and keep the elements whose side
/// `keep` accepts. Output stays ascending.
fn merge_walk<T: Ord + Copy>(a: &[T], b: &[T], keep: impl Fn(Side) -> bool) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);

    loop {
        let (side, value) = match (a.get(i), b.get(j)) {
            (Some(&x), Some(&y)) => match x.cmp(&y) {
                Ordering::Less => {
                    i += 1;
                    (Side::Left, x)
                }
                Ordering::Greater => {
                    j += 1;
                    (Side::Right, y)
                }
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                    (Side::Both, x)
                }
            },
            (Some(&x), None) => {
                i += 1;
                (Side::Left, x)
            }
            (None, Some(&y)) => {
                j += 1;
                (Side::Right, y)
            }
            (None, None) => break,
        };

        if keep(side) {
            out.push(value);
        }
    }

    out
}

/// Elements present in both sorted slices.
#[inline]
pub fn intersect_sorted<T: Ord + Copy>(a: &[T], b: &[T]) -> Vec<T> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    merge_walk(a, b, |side| side == Side::Both)
}

/// Union of two sorted slices; shared elements appear once.
#[inline]
pub fn union_sorted<T: Ord + Copy>(a: &[T], b: &[T]) -> Vec<T> {
    merge_walk(a, b, |_| true)
}

/// Elements of `base` missing from `sub`.
#[inline]
pub fn diff_sorted<T: Ord + Copy>(base: &[T], sub: &[T]) -> Vec<T> {
    if sub.is_empty() {
        return base.to_vec();
    }
    merge_walk(base, sub, |side| side == Side::Left)
}

#[cfg(test)]
#[path = "helpers_tests.rs"]
mod tests;
