//! Proactive content negotiation over the `Accept*` request headers.
//!
//! Every header is parsed into a list of [`Accepted`] entries. An offered
//! value is ranked by the single entry that describes it best: the most
//! *specific* entry wins, then the highest quality, then the one listed last.
//! Offers are then sorted by quality, specificity, header order and offer
//! order. Anything with quality 0 is unacceptable.

use std::cmp::Ordering;

/// Which `Accept*` header is being negotiated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    MediaType,
    Charset,
    Encoding,
    Language,
}

impl Kind {
    /// What an absent header means.
    fn absent(self) -> &'static str {
        match self {
            Self::MediaType => "*/*",
            Self::Charset | Self::Language => "*",
            Self::Encoding => "",
        }
    }
}

/// Quality value as fixed point thousandths, `0..=1000`.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct QValue(u16);

impl QValue {
    pub const MAX: QValue = QValue(1000);

    /// Parses `0`, `0.5`, `1.000` and the like. Out-of-range values clamp.
    pub fn parse(raw: &str) -> Option<Self> {
        let q: f32 = raw.trim().parse().ok()?;
        if !q.is_finite() {
            return None;
        }
        Some(Self((q.clamp(0.0, 1.0) * 1000.0).round() as u16))
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }
}

/// One comma-separated entry of an `Accept*` header.
#[derive(Clone, Debug, PartialEq)]
pub struct Accepted {
    /// `text/html`, `utf-8`, `gzip`, `en-US`, or a wildcard.
    pub value: String,
    /// Media-type parameters other than `q`, lowercased keys.
    pub params: Vec<(String, String)>,
    pub q: QValue,
    /// Position in the header.
    pub index: usize,
}

impl Accepted {
    fn split_media(&self) -> (&str, &str) {
        self.value.split_once('/').unwrap_or((self.value.as_str(), ""))
    }
}

/// Parses a raw header value; `None` stands for an absent header.
pub fn parse(kind: Kind, header: Option<&str>) -> Vec<Accepted> {
    let raw = header.unwrap_or(kind.absent());
    let mut out: Vec<Accepted> = Vec::new();

    for (index, part) in split_quoted(raw, ',').into_iter().enumerate() {
        if let Some(entry) = parse_entry(kind, part, index) {
            out.push(entry);
        }
    }

    // identity stays acceptable unless the client names it (or `*`) itself.
    if kind == Kind::Encoding && !out.iter().any(|e| specificity(kind, "identity", e).is_some()) {
        let min_q = out.iter().map(|e| e.q).min().unwrap_or(QValue::MAX);
        out.push(Accepted {
            value: "identity".to_owned(),
            params: Vec::new(),
            q: min_q,
            index: out.len(),
        });
    }
    out
}

fn parse_entry(kind: Kind, part: &str, index: usize) -> Option<Accepted> {
    let mut pieces = split_quoted(part, ';').into_iter();
    let value = pieces.next()?.trim();
    if value.is_empty() || value.contains(char::is_whitespace) {
        return None;
    }
    if kind == Kind::MediaType && !value.contains('/') {
        return None;
    }

    let mut q = QValue::MAX;
    let mut params = Vec::new();
    for piece in pieces {
        let Some((k, v)) = piece.split_once('=') else {
            continue;
        };
        let key = k.trim().to_ascii_lowercase();
        let val = v.trim().trim_matches('"');
        if key == "q" {
            q = QValue::parse(val)?;
            break;
        }
        params.push((key, val.to_owned()));
    }

    Some(Accepted { value: value.to_owned(), params, q, index })
}

/// Splits on `sep`, ignoring separators inside double quotes.
fn split_quoted(raw: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in raw.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == sep && !quoted {
            parts.push(&raw[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&raw[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// How specifically `entry` describes `offer`, or `None` if it does not.
fn specificity(kind: Kind, offer: &str, entry: &Accepted) -> Option<u8> {
    match kind {
        Kind::MediaType => media_specificity(offer, entry),
        Kind::Charset | Kind::Encoding => {
            if entry.value.eq_ignore_ascii_case(offer) {
                Some(1)
            } else if entry.value == "*" {
                Some(0)
            } else {
                None
            }
        }
        Kind::Language => {
            let (prefix, _) = offer.split_once('-').unwrap_or((offer, ""));
            let (entry_prefix, _) = entry.value.split_once('-').unwrap_or((entry.value.as_str(), ""));
            if entry.value.eq_ignore_ascii_case(offer) {
                Some(4)
            } else if entry_prefix.eq_ignore_ascii_case(offer) {
                Some(2)
            } else if entry.value.eq_ignore_ascii_case(prefix) {
                Some(1)
            } else if entry.value == "*" {
                Some(0)
            } else {
                None
            }
        }
    }
}

fn media_specificity(offer: &str, entry: &Accepted) -> Option<u8> {
    let mut parts = offer.split(';');
    let essence = parts.next()?.trim();
    let (ty, subtype) = essence.split_once('/')?;
    let offer_params: Vec<(String, &str)> = parts
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().trim_matches('"')))
        .collect();

    let (entry_ty, entry_sub) = entry.split_media();
    let mut s = 0;

    if entry_ty.eq_ignore_ascii_case(ty) {
        s |= 4;
    } else if entry_ty != "*" {
        return None;
    }

    if entry_sub.eq_ignore_ascii_case(subtype) {
        s |= 2;
    } else if entry_sub != "*" {
        return None;
    }

    if !entry.params.is_empty() {
        let all = entry.params.iter().all(|(k, v)| {
            let theirs = offer_params.iter().find(|(ok, _)| ok == k).map_or("", |(_, ov)| *ov);
            v == "*" || v.eq_ignore_ascii_case(theirs)
        });
        if !all {
            return None;
        }
        s |= 1;
    }
    Some(s)
}

#[derive(Clone, Copy, Debug)]
struct Priority {
    offer: usize,
    order: Option<usize>,
    q: QValue,
    s: u8,
}

fn priority(kind: Kind, offer: &str, offer_index: usize, accepted: &[Accepted]) -> Priority {
    let mut best = Priority { offer: offer_index, order: None, q: QValue(0), s: 0 };
    for entry in accepted {
        let Some(s) = specificity(kind, offer, entry) else {
            continue;
        };
        let candidate = Priority { offer: offer_index, order: Some(entry.index), q: entry.q, s };
        let better = (candidate.s, candidate.q, candidate.order) > (best.s, best.q, best.order);
        if better {
            best = candidate;
        }
    }
    best
}

fn compare(a: &Priority, b: &Priority) -> Ordering {
    b.q.cmp(&a.q)
        .then(b.s.cmp(&a.s))
        .then(a.order.cmp(&b.order))
        .then(a.offer.cmp(&b.offer))
}

/// Indices into `offered`, most preferred first, acceptable ones only.
pub fn preferred(kind: Kind, accepted: &[Accepted], offered: &[&str]) -> Vec<usize> {
    let mut ranked: Vec<Priority> = offered
        .iter()
        .enumerate()
        .map(|(i, offer)| priority(kind, offer, i, accepted))
        .filter(|p| p.q > QValue(0))
        .collect();
    ranked.sort_by(compare);
    ranked.into_iter().map(|p| p.offer).collect()
}

/// Every acceptable value the client listed, most preferred first.
pub fn accepted_values(accepted: &[Accepted]) -> Vec<String> {
    let mut entries: Vec<&Accepted> = accepted.iter().filter(|e| e.q > QValue(0)).collect();
    entries.sort_by(|a, b| b.q.cmp(&a.q).then(a.index.cmp(&b.index)));
    entries.into_iter().map(|e| e.value.clone()).collect()
}
