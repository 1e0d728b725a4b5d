use once_cell::sync::Lazy;
use regex::Regex;

pub type PointId = u64;
pub type BuildingId = u64;

const POINT_PREFIX: &str = "point-";

// point-43=44-39-45
static POINT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^point-(\d+)(?:=(\d+(?:-\d+)*))?$").unwrap());

// stairs-elevator-1=2, shop-1=3000, pointless-5000=1, shop-7=
// The `point-` prefix is rejected separately since the regex crate has no lookahead.
static BUILDING_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z]+)-(?:([a-zA-Z]+)-)?(\d+)=((?:\d+(?:-\d+)*)?)$").unwrap()
});

static LETTERS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointCode {
    pub id: PointId,
    /// Neighbor ids in textual order.
    pub neighbors: Vec<PointId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingCode {
    pub kind: String,
    pub subtype: Option<String>,
    pub id: BuildingId,
    pub entrances: Vec<PointId>,
}

pub fn extract_point_id_number(id_attr: &str) -> Option<PointId> {
    let caps = POINT_ID_RE.captures(id_attr)?;
    caps.get(1)?.as_str().parse().ok()
}

pub fn extract_building_id_number(id_attr: &str) -> Option<BuildingId> {
    if id_attr.starts_with(POINT_PREFIX) {
        return None;
    }
    let caps = BUILDING_ID_RE.captures(id_attr)?;
    caps.get(3)?.as_str().parse().ok()
}

/// `point-<id>[=<neighbor>-<neighbor>...]`
pub fn decode_point(id_attr: &str) -> Option<PointCode> {
    if id_attr.is_empty() {
        return None;
    }
    let caps = POINT_ID_RE.captures(id_attr)?;
    let id = caps.get(1)?.as_str().parse().ok()?;
    let neighbors = match caps.get(2) {
        Some(list) => parse_id_list(list.as_str())?,
        None => Vec::new(),
    };
    Some(PointCode { id, neighbors })
}

/// `<type>-[<subtype>-]<id>=[<entrance>-<entrance>...]`
pub fn decode_building(id_attr: &str) -> Option<BuildingCode> {
    if id_attr.is_empty() || id_attr.starts_with(POINT_PREFIX) {
        return None;
    }
    let caps = BUILDING_ID_RE.captures(id_attr)?;
    let kind = caps.get(1)?.as_str().to_string();
    let subtype = caps.get(2).map(|m| m.as_str().to_string());
    let id = caps.get(3)?.as_str().parse().ok()?;
    let entrances = match caps.get(4).map(|m| m.as_str()) {
        Some(list) if !list.is_empty() => parse_id_list(list)?,
        _ => Vec::new(),
    };
    Some(BuildingCode {
        kind,
        subtype,
        id,
        entrances,
    })
}

/// Renders `point-<id>` or `point-<id>=<n>-<n>...`; no `=` when there are no neighbors.
pub fn encode_point<'a, I>(id: PointId, neighbors: I) -> String
where
    I: IntoIterator<Item = &'a PointId>,
{
    let list = join_ids(neighbors);
    if list.is_empty() {
        format!("{POINT_PREFIX}{id}")
    } else {
        format!("{POINT_PREFIX}{id}={list}")
    }
}

/// Renders `<type>-[<subtype>-]<id>=<entrances>`; the `=` is always present.
pub fn encode_building(
    kind: &str,
    subtype: Option<&str>,
    id: BuildingId,
    entrances: &[PointId],
) -> String {
    let mut out = String::with_capacity(kind.len() + 16);
    out.push_str(kind);
    out.push('-');
    if let Some(subtype) = subtype.filter(|s| !s.is_empty()) {
        out.push_str(subtype);
        out.push('-');
    }
    out.push_str(&id.to_string());
    out.push('=');
    out.push_str(&join_ids(entrances));
    out
}

/// Largest id any of `ids` carries for one entity namespace; 0 when none match.
pub fn max_existing_id<'a, I, F>(ids: I, extract: F) -> u64
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(&str) -> Option<u64>,
{
    ids.into_iter().filter_map(extract).max().unwrap_or(0)
}

/// Whether `segment` can be used as a building type or subtype and still decode.
pub fn is_valid_building_segment(segment: &str) -> bool {
    LETTERS_RE.is_match(segment)
}

fn parse_id_list(list: &str) -> Option<Vec<u64>> {
    list.split('-').map(|part| part.parse().ok()).collect()
}

fn join_ids<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a u64>,
{
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
