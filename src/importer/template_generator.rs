// ==========================================
// Excel2DB - 空白模板生成
// ==========================================
// 职责: 按模板的表头列生成可下载的 .xlsx 空白模板
// 格式: 单个工作表"模板"，首行加粗表头，列宽 20
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::template_registry::TemplateRegistry;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::info;

/// 模板工作表名
pub const TEMPLATE_SHEET_NAME: &str = "模板";

/// 模板列宽
pub const TEMPLATE_COLUMN_WIDTH: f64 = 20.0;

pub struct TemplateGenerator<'a> {
    registry: &'a TemplateRegistry,
}

impl<'a> TemplateGenerator<'a> {
    pub fn new(registry: &'a TemplateRegistry) -> Self {
        Self { registry }
    }

    /// 模板期望的表头（按列顺序）
    pub fn template_columns(&self, template_id: &str) -> ImportResult<Vec<String>> {
        Ok(self.registry.lookup(template_id)?.descriptor().sheet_labels())
    }

    /// 下载文件名（含 .xlsx 后缀）
    pub fn file_name(&self, template_id: &str) -> ImportResult<String> {
        let handler = self.registry.lookup(template_id)?;
        Ok(format!("{}.xlsx", handler.descriptor().template_file_name()))
    }

    fn build_workbook(&self, template_id: &str) -> ImportResult<Workbook> {
        let columns = self.template_columns(template_id)?;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(TEMPLATE_SHEET_NAME)?;

        let header_format = Format::new().set_bold();
        for (idx, label) in columns.iter().enumerate() {
            let col = idx as u16;
            sheet.write_string_with_format(0, col, label, &header_format)?;
            sheet.set_column_width(col, TEMPLATE_COLUMN_WIDTH)?;
        }

        Ok(workbook)
    }

    /// 生成模板文件内容
    pub fn generate(&self, template_id: &str) -> ImportResult<Vec<u8>> {
        let mut workbook = self.build_workbook(template_id)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 生成模板并写入磁盘
    pub fn save<P: AsRef<Path>>(&self, template_id: &str, path: P) -> ImportResult<()> {
        let mut workbook = self.build_workbook(template_id)?;
        workbook.save(path.as_ref())?;
        info!(template_id = %template_id, path = %path.as_ref().display(), "空白模板已生成");
        Ok(())
    }
}
