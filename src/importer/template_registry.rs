// ==========================================
// Excel2DB - 模板注册表
// ==========================================
// 职责: 模板标识 → 模板处理器
// 约束:
// - 进程启动时构建，之后只读（register 需要 &mut，构建完成后以 Arc 共享）
// - 标识大小写不敏感
// - 重复注册同一标识时后者覆盖前者
// ==========================================

use crate::config::TemplateConfigReader;
use crate::domain::TemplateDescriptor;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::TemplateHandler;
use crate::importer::template_handler::{GenericTemplate, LanguageTemplate, QkzlmbaTemplate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
pub struct TemplateRegistry {
    handlers: BTreeMap<String, Arc<dyn TemplateHandler>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置模板（language / qkzlmba）
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_builtin(&BuiltinOverrides::none());
        registry
    }

    /// 内置模板 + 配置覆写 + 配置定义的模板
    pub fn from_config(config: &dyn TemplateConfigReader) -> ImportResult<Self> {
        let mut registry = Self::new();
        registry.register_builtin(&BuiltinOverrides::from_config(config));

        for descriptor in config.custom_templates() {
            let id = descriptor.id.clone();
            registry.register(&id, Arc::new(GenericTemplate::new(descriptor)))?;
        }

        info!(templates = ?registry.ids(), "模板注册完成");
        Ok(registry)
    }

    fn register_builtin(&mut self, overrides: &BuiltinOverrides) {
        let language = overrides.apply(LanguageTemplate::builtin_descriptor());
        let qkzlmba = overrides.apply(QkzlmbaTemplate::builtin_descriptor());
        self.insert(
            LanguageTemplate::ID,
            Arc::new(LanguageTemplate::with_descriptor(language)),
        );
        self.insert(
            QkzlmbaTemplate::ID,
            Arc::new(QkzlmbaTemplate::with_descriptor(qkzlmba)),
        );
    }

    fn insert(&mut self, id: &str, handler: Arc<dyn TemplateHandler>) {
        let key = id.trim().to_lowercase();
        if self.handlers.insert(key.clone(), handler).is_some() {
            debug!(template_id = %key, "模板重复注册，覆盖原处理器");
        } else {
            debug!(template_id = %key, "注册模板");
        }
    }

    /// 注册模板处理器
    ///
    /// # 返回
    /// - Err(InvalidTemplate): 模板描述不一致（非法表名、去重键不在列中等）
    pub fn register(&mut self, id: &str, handler: Arc<dyn TemplateHandler>) -> ImportResult<()> {
        if let Err(message) = handler.descriptor().check() {
            return Err(ImportError::InvalidTemplate {
                template: id.to_string(),
                message,
            });
        }
        self.insert(id, handler);
        Ok(())
    }

    /// 按标识查找模板处理器
    ///
    /// # 返回
    /// - Err(UnknownTemplate): 未注册的标识
    pub fn lookup(&self, id: &str) -> ImportResult<Arc<dyn TemplateHandler>> {
        self.handlers
            .get(&id.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| ImportError::UnknownTemplate(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(&id.trim().to_lowercase())
    }

    /// 已注册模板标识（有序）
    pub fn ids(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn TemplateHandler>> {
        self.handlers.values()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// 内置模板的配置覆写
struct BuiltinOverrides<'a> {
    config: Option<&'a dyn TemplateConfigReader>,
}

impl<'a> BuiltinOverrides<'a> {
    fn none() -> Self {
        Self { config: None }
    }

    fn from_config(config: &'a dyn TemplateConfigReader) -> Self {
        Self {
            config: Some(config),
        }
    }

    fn apply(&self, mut descriptor: TemplateDescriptor) -> TemplateDescriptor {
        if let Some(config) = self.config {
            if let Some(o) = config.template_override(&descriptor.id) {
                descriptor.apply_overrides(o.file_name.as_deref(), &o.defaults);
            }
        }
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnSpec, TemplateDescriptor};

    fn demo_descriptor(table: &str) -> TemplateDescriptor {
        TemplateDescriptor {
            id: "demo".to_string(),
            display_name: "示例".to_string(),
            table: table.to_string(),
            key_column: "id".to_string(),
            columns: vec![ColumnSpec::required("名称", "mc")],
            identity: vec![],
            derived: vec![],
            file_name: None,
        }
    }

    #[test]
    fn test_builtin_lookup() {
        let registry = TemplateRegistry::with_builtin();
        assert_eq!(registry.ids(), vec!["language", "qkzlmba"]);
        assert_eq!(
            registry.lookup("language").unwrap().descriptor().table,
            "zd_language"
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = TemplateRegistry::with_builtin();
        assert!(registry.lookup("QKZLMBA").is_ok());
    }

    #[test]
    fn test_unknown_template() {
        let registry = TemplateRegistry::with_builtin();
        match registry.lookup("bogus") {
            Err(ImportError::UnknownTemplate(id)) => assert_eq!(id, "bogus"),
            other => panic!("expected UnknownTemplate, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = TemplateRegistry::new();
        registry
            .register("demo", Arc::new(GenericTemplate::new(demo_descriptor("t_a"))))
            .unwrap();
        registry
            .register("demo", Arc::new(GenericTemplate::new(demo_descriptor("t_b"))))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("demo").unwrap().descriptor().table, "t_b");
    }

    #[test]
    fn test_register_rejects_invalid_descriptor() {
        let mut registry = TemplateRegistry::new();
        let result = registry.register(
            "demo",
            Arc::new(GenericTemplate::new(demo_descriptor("bad table"))),
        );
        assert!(matches!(result, Err(ImportError::InvalidTemplate { .. })));
        assert!(registry.is_empty());
    }
}
