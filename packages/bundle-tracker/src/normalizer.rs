//! Conversion of raw nested payloads into ordered sets of flat
//! semantic records.

use serde_json::Value;

use crate::html;
use crate::mapper;
use crate::payload;
use crate::types::{RecordSet, ResourceDescriptor};

/// Normalize one payload document into the descriptor's record shape.
///
/// Locates the raw record array along the descriptor's nested path,
/// projects each element through the field mapping, strips markup from
/// declared free-text columns, and applies the optional row filter.
/// An absent path or list is a normal outcome and yields an empty set;
/// callers must treat empty as "nothing to report", not a failure.
pub fn normalize(document: &Value, descriptor: &ResourceDescriptor) -> RecordSet {
    let raw_records = payload::records_at(document, &descriptor.payload_path);

    if raw_records.is_empty() {
        tracing::info!(
            resource = %descriptor.key,
            path = ?descriptor.payload_path,
            "no records found at payload path"
        );
        return RecordSet::default();
    }

    let mut records = Vec::with_capacity(raw_records.len());

    for value in raw_records {
        let Some(object) = value.as_object() else {
            tracing::debug!(resource = %descriptor.key, "skipping non-object payload entry");
            continue;
        };

        let mut record = mapper::map_record(object, &descriptor.mapping);

        for column in descriptor.mapping.columns.iter().filter(|c| c.free_text) {
            if let Some(value) = record.fields.get_mut(&column.semantic) {
                let stripped = html::strip(Some(value.as_str()));
                *value = stripped;
            }
        }

        if let Some(filter) = &descriptor.filter {
            if !filter.matches(&record) {
                continue;
            }
        }

        records.push(record);
    }

    tracing::debug!(
        resource = %descriptor.key,
        raw = raw_records.len(),
        normalized = records.len(),
        "payload normalized"
    );

    RecordSet { records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldMapping, RowFilter};
    use serde_json::json;

    fn goods_descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "list1",
            "物品列表",
            &["sys_gs_dbs_fs_goodsbaseinfo", "root", "goodslist", "goods"],
            FieldMapping::new()
                .column("a", "物品ID")
                .column("b", "物品名称")
                .column("j", "价值"),
            "物品ID",
            "物品名称",
        )
    }

    fn skill_descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "list5",
            "技能列表",
            &["root", "skilllist", "skill"],
            FieldMapping::new()
                .column("a", "技能ID")
                .column("b", "技能名称")
                .text_column("d", "技能描述")
                .column("f", "技能分类"),
            "技能ID",
            "技能名称",
        )
        .with_filter(RowFilter::new("技能分类", "武将"))
    }

    #[test]
    fn normalizes_goods_payload() {
        let document = json!({
            "sys_gs_dbs_fs_goodsbaseinfo": {
                "root": {
                    "goodslist": {
                        "goods": [
                            {"a": 1, "b": "青釭剑", "j": 50},
                            {"a": 2, "b": "寒冰剑", "j": 60},
                        ]
                    }
                }
            }
        });

        let set = normalize(&document, &goods_descriptor());
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].get("物品ID"), Some("1"));
        assert_eq!(set.records[1].get("物品名称"), Some("寒冰剑"));
    }

    #[test]
    fn missing_path_yields_empty_set_not_error() {
        let document = json!({"sys_gs_dbs_fs_goodsbaseinfo": {"root": {}}});
        assert!(normalize(&document, &goods_descriptor()).is_empty());

        let document = json!({});
        assert!(normalize(&document, &goods_descriptor()).is_empty());
    }

    #[test]
    fn strips_markup_from_text_columns() {
        let document = json!({
            "root": {
                "skilllist": {
                    "skill": [
                        {"a": 7, "b": "奸雄", "d": "<b>奸雄</b>：你可以获得对你造成伤害的牌。", "f": "武将"},
                    ]
                }
            }
        });

        let set = normalize(&document, &skill_descriptor());
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.records[0].get("技能描述"),
            Some("奸雄：你可以获得对你造成伤害的牌。")
        );
    }

    #[test]
    fn row_filter_keeps_marked_records_only() {
        let document = json!({
            "root": {
                "skilllist": {
                    "skill": [
                        {"a": 1, "b": "甲", "f": "武将,主动"},
                        {"a": 2, "b": "乙", "f": "装备"},
                        {"a": 3, "b": "丙"},
                    ]
                }
            }
        });

        let set = normalize(&document, &skill_descriptor());
        assert_eq!(set.len(), 1);
        assert_eq!(set.records[0].get("技能ID"), Some("1"));
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let document = json!({
            "sys_gs_dbs_fs_goodsbaseinfo": {
                "root": {
                    "goodslist": {
                        "goods": [{"a": 1}, 42, "noise"]
                    }
                }
            }
        });

        let set = normalize(&document, &goods_descriptor());
        assert_eq!(set.len(), 1);
    }
}
