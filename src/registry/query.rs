//! Read-only listing of ban records.

use std::cmp::Ordering;

use crate::address::AddressSpec;
use crate::record::{BanRecord, CreatorId};
use crate::Category;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

/// Column to order listings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderColumn {
    #[default]
    Id,
    CreatedAt,
    UpdatedAt,
    LastHitAt,
}

/// Listing order. Timestamp orders break ties by id, newest first;
/// records that were never hit sort last under `LastHitAt` in either
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BanOrder {
    pub column: OrderColumn,
    pub direction: Direction,
}

impl BanOrder {
    pub fn new(column: OrderColumn, direction: Direction) -> Self {
        Self { column, direction }
    }

    /// Parse `created_at`, `updated_at` or `last_hit_at`, optionally
    /// suffixed with `_asc` or `_desc` (default `desc`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        let (name, direction) = if let Some(name) = s.strip_suffix("_asc") {
            (name, Direction::Asc)
        } else if let Some(name) = s.strip_suffix("_desc") {
            (name, Direction::Desc)
        } else {
            (s.as_str(), Direction::Desc)
        };
        let column = match name {
            "created_at" => OrderColumn::CreatedAt,
            "updated_at" => OrderColumn::UpdatedAt,
            "last_hit_at" => OrderColumn::LastHitAt,
            _ => return None,
        };
        Some(Self { column, direction })
    }

    pub(crate) fn compare(&self, a: &BanRecord, b: &BanRecord) -> Ordering {
        let primary = match self.column {
            OrderColumn::Id => return self.direction.apply(a.id.cmp(&b.id)),
            OrderColumn::CreatedAt => self.direction.apply(a.created_at.cmp(&b.created_at)),
            OrderColumn::UpdatedAt => self.direction.apply(a.updated_at.cmp(&b.updated_at)),
            OrderColumn::LastHitAt => match (a.last_hit_at, b.last_hit_at) {
                (Some(x), Some(y)) => self.direction.apply(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

/// Filters and ordering for [`BanRegistry::list`](super::BanRegistry::list).
#[derive(Debug, Clone, Default)]
pub struct BanQuery {
    pub category: Option<Category>,
    pub is_deleted: Option<bool>,
    pub creator_id: Option<CreatorId>,
    /// Only bans whose subnet contains this address or subnet
    pub containing: Option<AddressSpec>,
    pub order: BanOrder,
    pub limit: Option<usize>,
}

impl BanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn deleted(mut self, is_deleted: bool) -> Self {
        self.is_deleted = Some(is_deleted);
        self
    }

    pub fn creator(mut self, creator_id: CreatorId) -> Self {
        self.creator_id = Some(creator_id);
        self
    }

    pub fn containing(mut self, spec: AddressSpec) -> Self {
        self.containing = Some(spec);
        self
    }

    pub fn order(mut self, order: BanOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, record: &BanRecord) -> bool {
        self.category.map_or(true, |c| record.category == c)
            && self.is_deleted.map_or(true, |d| record.is_deleted == d)
            && self.creator_id.map_or(true, |c| record.creator_id == c)
            && self
                .containing
                .as_ref()
                .map_or(true, |spec| record.subnet.contains(spec))
    }

    /// Filter, sort and truncate a set of records.
    pub(crate) fn apply(&self, records: impl IntoIterator<Item = BanRecord>) -> Vec<BanRecord> {
        let mut out: Vec<BanRecord> = records.into_iter().filter(|r| self.matches(r)).collect();
        out.sort_by(|a, b| self.order.compare(a, b));
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::BanId;
    use std::time::{Duration, SystemTime};

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn record(id: u64, created: u64, last_hit: Option<u64>) -> BanRecord {
        let mut r = BanRecord::new(
            BanId(id),
            AddressSpec::parse("203.0.113.0/24").unwrap(),
            Category::Full,
            CreatorId(1),
            "spam",
            at(created),
        );
        r.last_hit_at = last_hit.map(at);
        r
    }

    fn ids(records: &[BanRecord]) -> Vec<u64> {
        records.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(
            BanOrder::parse("created_at"),
            Some(BanOrder::new(OrderColumn::CreatedAt, Direction::Desc))
        );
        assert_eq!(
            BanOrder::parse("last_hit_at_asc"),
            Some(BanOrder::new(OrderColumn::LastHitAt, Direction::Asc))
        );
        assert_eq!(
            BanOrder::parse("UPDATED_AT_DESC"),
            Some(BanOrder::new(OrderColumn::UpdatedAt, Direction::Desc))
        );
        assert_eq!(BanOrder::parse("hit_count"), None);
        assert_eq!(BanOrder::parse("created_at_sideways"), None);
    }

    #[test]
    fn test_default_order_is_id_desc() {
        let query = BanQuery::new();
        let out = query.apply(vec![record(1, 0, None), record(3, 0, None), record(2, 0, None)]);
        assert_eq!(ids(&out), vec![3, 2, 1]);
    }

    #[test]
    fn test_created_at_ties_break_by_id_desc() {
        let query = BanQuery::new().order(BanOrder::new(OrderColumn::CreatedAt, Direction::Asc));
        let out = query.apply(vec![record(1, 20, None), record(2, 10, None), record(3, 10, None)]);
        assert_eq!(ids(&out), vec![3, 2, 1]);
    }

    #[test]
    fn test_last_hit_nulls_last_both_directions() {
        let records = vec![
            record(1, 0, None),
            record(2, 0, Some(50)),
            record(3, 0, Some(10)),
            record(4, 0, None),
        ];
        let desc = BanQuery::new().order(BanOrder::parse("last_hit_at").unwrap());
        assert_eq!(ids(&desc.apply(records.clone())), vec![2, 3, 4, 1]);

        let asc = BanQuery::new().order(BanOrder::parse("last_hit_at_asc").unwrap());
        assert_eq!(ids(&asc.apply(records)), vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_filters_and_limit() {
        let mut deleted = record(2, 0, None);
        deleted.is_deleted = true;
        let mut partial = record(3, 0, None);
        partial.category = Category::Partial;
        let records = vec![record(1, 0, None), deleted, partial];

        let active_full = BanQuery::new().category(Category::Full).deleted(false);
        assert_eq!(ids(&active_full.apply(records.clone())), vec![1]);

        let containing = BanQuery::new().containing(AddressSpec::parse("203.0.113.9").unwrap());
        assert_eq!(containing.apply(records.clone()).len(), 3);

        let elsewhere = BanQuery::new().containing(AddressSpec::parse("198.51.100.1").unwrap());
        assert!(elsewhere.apply(records.clone()).is_empty());

        assert_eq!(ids(&BanQuery::new().limit(2).apply(records)), vec![3, 2]);
    }
}
