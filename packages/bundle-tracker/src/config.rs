//! Tracker configuration and the built-in resource descriptors.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::types::{FieldMapping, ResourceDescriptor, RowFilter};

/// Where the tracked bundles live.
pub const DEFAULT_BASE_URL: &str = "https://web.sanguosha.com/220/u3d/AppCfgData/";

/// Runtime knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Base URL the per-resource file names are joined onto.
    pub base_url: Url,
    /// Directory holding archives, extracted payloads, record sinks,
    /// the version store and the change log.
    pub work_dir: PathBuf,
    /// Deadline for the metadata-only query.
    pub head_timeout: Duration,
    /// Deadline for the full download.
    pub fetch_timeout: Duration,
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            work_dir: PathBuf::from("sgs_data"),
            head_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(20),
            user_agent: "SgsBundleTracker/1.0".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_timeouts(mut self, head: Duration, fetch: Duration) -> Self {
        self.head_timeout = head;
        self.fetch_timeout = fetch;
        self
    }
}

/// The fixed, ordered list of tracked resources.
///
/// Key paths and letter-keyed mappings follow the bundle payloads as
/// shipped; semantic names are the column captions of the exported
/// tables.
pub fn default_resources() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new(
            "list1",
            "物品列表",
            &["sys_gs_dbs_fs_goodsbaseinfo", "root", "goodslist", "goods"],
            FieldMapping::new()
                .column("a", "物品ID")
                .column("b", "物品名称")
                .column("e", "类型ID")
                .column("g", "有效期(秒)")
                .column("j", "价值")
                .column("l", "礼包内容")
                .column("m", "图标ID"),
            "物品ID",
            "物品名称",
        ),
        ResourceDescriptor::new(
            "list2",
            "武将台词",
            &["sys_h5_music", "root", "heromusic"],
            FieldMapping::new()
                .column("a", "武将ID")
                .column("b", "皮肤ID")
                .column("d", "技能名称")
                .column("e", "事件类型")
                .column("f", "语音路径_男")
                .column("g", "语音路径_女")
                .text_column("m", "台词_男")
                .text_column("n", "台词_女")
                .column("SkinStyle", "皮肤样式")
                .column("author", "画师"),
            "皮肤ID",
            "技能名称",
        ),
        ResourceDescriptor::new(
            "list5",
            "技能列表",
            &["sys_gs_dbs_fs_skillinfo", "root", "skilllist", "skill"],
            FieldMapping::new()
                .column("a", "技能ID")
                .column("b", "技能名称")
                .text_column("d", "技能描述")
                .column("f", "技能分类")
                .column("h", "技能类型"),
            "技能ID",
            "技能名称",
        )
        .with_filter(RowFilter::new("技能分类", "武将")),
    ]
}
