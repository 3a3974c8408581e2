//! テンプレート画像ライブラリ
//!
//! 画面上のアンカー（ボタン・メニュー）の切り抜き画像を管理する。
//! 画像はグレースケールで読み込み、1回の実行の間だけキャッシュする。

use crate::error::{BotError, Result};
use image::{GrayImage, ImageReader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const CUSM: &str = "CUSM.jpg";
pub const CIMT: &str = "CIMT.jpg";
pub const COMT: &str = "COMT.jpg";
pub const ITPI: &str = "ITPI.jpg";
pub const SEARCH: &str = "SEARCH2.jpg";

/// 各画面への移動に使うアンカー画像
pub const REQUIRED_TEMPLATES: &[&str] = &[CUSM, CIMT, COMT, ITPI, SEARCH];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

#[derive(Debug)]
pub struct TemplateLibrary {
    dir: PathBuf,
    cache: HashMap<String, GrayImage>,
}

impl TemplateLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// 全テンプレートのファイル存在を確認
    ///
    /// 最初に見つからなかったファイルでエラーを返す
    pub fn ensure_exists(&self, names: &[&str]) -> Result<()> {
        for name in names {
            let path = self.path(name);
            if !path.is_file() {
                tracing::error!(template = %path.display(), "テンプレート画像が見つかりません");
                return Err(BotError::TemplateNotFound(path.display().to_string()));
            }
        }
        Ok(())
    }

    /// テンプレートをグレースケールで読み込み（キャッシュ付き）
    pub fn load(&mut self, name: &str) -> Result<&GrayImage> {
        if !self.cache.contains_key(name) {
            let path = self.path(name);
            if !path.is_file() {
                return Err(BotError::TemplateNotFound(path.display().to_string()));
            }

            // 拡張子ではなく中身で形式を判定する
            let image = ImageReader::open(&path)?
                .with_guessed_format()?
                .decode()
                .map_err(|e| BotError::ImageLoad(format!("{}: {}", path.display(), e)))?
                .to_luma8();
            tracing::debug!(template = name, width = image.width(), height = image.height(), "テンプレート読み込み");
            self.cache.insert(name.to_string(), image);
        }

        self.cache
            .get(name)
            .ok_or_else(|| BotError::TemplateNotFound(name.to_string()))
    }

    /// フォルダ直下の画像ファイル一覧（ファイル名順）
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Err(BotError::FileNotFound(self.dir.display().to_string()));
        }

        let mut names: Vec<String> = WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| IMAGE_EXTENSIONS.iter().any(|&x| x == ext.to_string_lossy()))
                    .unwrap_or(false)
            })
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();

        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};
    use tempfile::tempdir;

    fn write_template(dir: &Path, name: &str) {
        let image = RgbImage::from_fn(8, 6, |x, y| image::Rgb([(x * 30) as u8, (y * 40) as u8, 0]));
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_ensure_exists_reports_missing() {
        let dir = tempdir().unwrap();
        write_template(dir.path(), CUSM);

        let library = TemplateLibrary::new(dir.path());
        assert!(library.ensure_exists(&[CUSM]).is_ok());

        let err = library.ensure_exists(&[CUSM, CIMT]).unwrap_err();
        match err {
            BotError::TemplateNotFound(path) => assert!(path.ends_with(CIMT)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_grayscale_and_cache() {
        let dir = tempdir().unwrap();
        write_template(dir.path(), "button.png");

        let mut library = TemplateLibrary::new(dir.path());
        let image = library.load("button.png").unwrap();
        assert_eq!(image.dimensions(), (8, 6));

        // キャッシュ済みならファイル削除後も読める
        std::fs::remove_file(dir.path().join("button.png")).unwrap();
        assert!(library.load("button.png").is_ok());
    }

    #[test]
    fn test_load_broken_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

        let mut library = TemplateLibrary::new(dir.path());
        assert!(matches!(library.load("broken.png"), Err(BotError::ImageLoad(_))));
    }

    #[test]
    fn test_list_images_sorted() {
        let dir = tempdir().unwrap();
        write_template(dir.path(), "b.png");
        write_template(dir.path(), "a.jpg");
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        image::GrayImage::from_pixel(2, 2, Luma([0])).save(dir.path().join("C.PNG")).unwrap();

        let library = TemplateLibrary::new(dir.path());
        assert_eq!(library.list().unwrap(), vec!["C.PNG", "a.jpg", "b.png"]);
    }

    #[test]
    fn test_list_missing_folder() {
        let library = TemplateLibrary::new("/nonexistent/templates/12345");
        assert!(library.list().is_err());
    }
}
