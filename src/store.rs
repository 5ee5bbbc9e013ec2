use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{PublicDir, RESULT_DIR_NAME, StoreOptions, UPLOAD_DIR_NAME};
use crate::error::{Result, StoreError};
use crate::metrics;

/// 列表接口中视为图片的扩展名
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "bmp"];

/// 图片保存的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// 用户上传的原始图片
    Upload,
    /// 生成的结果图片
    Result,
}

impl Bucket {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Upload => UPLOAD_DIR_NAME,
            Self::Result => RESULT_DIR_NAME,
        }
    }

    fn metric_label(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Result => "result",
        }
    }

    /// 文件在静态资源目录下的访问路径
    pub fn public_path(self, file_name: &str) -> String {
        format!("/{}/{}", self.dir_name(), file_name)
    }
}

/// 已写入磁盘的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub size: u64,
}

impl SavedFile {
    /// 返回文件名部分
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

/// 目录中的一张图片
#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub filename: String,
    pub path: String,
    pub size: u64,
    /// 修改时间，序列化为 RFC 3339
    pub modified: DateTime<Utc>,
}

/// 确保上传目录与结果目录存在，已存在时什么也不做
pub fn init_dirs(upload_dir: &Path, result_dir: &Path) -> Result<()> {
    for dir in [upload_dir, result_dir] {
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    }
    Ok(())
}

/// 基于本地目录的图片存储
#[derive(Debug, Clone)]
pub struct ImageStore {
    public_dir: PathBuf,
    upload_dir: PathBuf,
    result_dir: PathBuf,
    jpeg_quality: u8,
}

impl ImageStore {
    /// 打开存储，目录不存在时会自动创建
    pub fn open(dirs: &PublicDir, opts: &StoreOptions) -> Result<Self> {
        let store = Self {
            public_dir: dirs.path().to_path_buf(),
            upload_dir: dirs.upload_dir(),
            result_dir: dirs.result_dir(),
            jpeg_quality: opts.jpeg_quality.clamp(1, 100),
        };
        init_dirs(&store.upload_dir, &store.result_dir)?;
        debug!("图片存储目录: {}", store.public_dir.display());
        Ok(store)
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    fn dir(&self, bucket: Bucket) -> &Path {
        match bucket {
            Bucket::Upload => &self.upload_dir,
            Bucket::Result => &self.result_dir,
        }
    }

    /// 将上传的数据流以原文件名保存到上传目录，已存在的同名文件会被覆盖
    ///
    /// 只使用文件名的最后一段，避免写到上传目录之外。写入失败时不会清理已写入的部分。
    pub fn persist<R: Read>(&self, src: R, file_name: &str) -> Result<SavedFile> {
        let file_name = sanitize_file_name(file_name)?;
        let path = self.upload_dir.join(file_name);
        let size = copy_to_file(src, &path)?;
        metrics::inc_saved_file(Bucket::Upload.metric_label(), size);
        info!("保存上传图片: {} ({} 字节)", path.display(), size);
        Ok(SavedFile { path, size })
    }

    /// 以 `<field>-<uuid><ext>` 的形式保存文件，扩展名取自原文件名并转为小写
    pub fn persist_unique<R: Read>(
        &self,
        bucket: Bucket,
        src: R,
        field: &str,
        original_name: &str,
    ) -> Result<SavedFile> {
        let field = sanitize_file_name(field)?;
        let ext = Path::new(original_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let file_name = format!("{}-{}{}", field, Uuid::new_v4().simple(), ext);
        let path = self.dir(bucket).join(file_name);
        let size = copy_to_file(src, &path)?;
        metrics::inc_saved_file(bucket.metric_label(), size);
        info!("保存图片: {} ({} 字节)", path.display(), size);
        Ok(SavedFile { path, size })
    }

    /// 将图片编码为 JPEG，以随机 UUID 命名写入结果目录
    ///
    /// 带透明通道或高位深的图片会先转换为 8 位 RGB。先在内存中完成编码，
    /// 编码失败时不会留下任何文件。
    pub fn write_result(&self, image: &DynamicImage) -> Result<SavedFile> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(StoreError::EmptyImage { width, height });
        }

        let start = Instant::now();
        let bytes = encode_jpeg(image, self.jpeg_quality)?;
        metrics::observe_encode_duration(start.elapsed().as_secs_f32());

        let path = self.result_dir.join(format!("{}.jpg", Uuid::new_v4()));
        fs::write(&path, &bytes).map_err(|e| StoreError::io(&path, e))?;

        let size = bytes.len() as u64;
        metrics::inc_saved_file(Bucket::Result.metric_label(), size);
        info!("写入结果图片: {} ({}x{})", path.display(), width, height);
        Ok(SavedFile { path, size })
    }

    pub fn list_uploads(&self) -> Result<Vec<StoredImage>> {
        list_images(&self.upload_dir, Bucket::Upload)
    }

    pub fn list_results(&self) -> Result<Vec<StoredImage>> {
        list_images(&self.result_dir, Bucket::Result)
    }

    /// 删除上传目录中的文件
    ///
    /// 与保存时不同，这里的文件名不做截取：带路径分隔符的名字直接拒绝
    pub fn delete_upload(&self, file_name: &str) -> Result<()> {
        let name = plain_file_name(file_name)?;
        let path = self.upload_dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("删除上传图片: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

/// 取客户端文件名的最后一段，同时兼容 `/` 与 `\` 分隔符
fn sanitize_file_name(name: &str) -> Result<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    if base.is_empty() || base == "." || base == ".." {
        return Err(StoreError::InvalidFileName(name.to_string()));
    }
    Ok(base)
}

/// 只允许单独的文件名
fn plain_file_name(name: &str) -> Result<&str> {
    if name.contains(['/', '\\']) {
        return Err(StoreError::InvalidFileName(name.to_string()));
    }
    sanitize_file_name(name)
}

fn copy_to_file<R: Read>(mut src: R, path: &Path) -> Result<u64> {
    let mut file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    io::copy(&mut src, &mut file).map_err(|e| StoreError::io(path, e))
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => {
            image.write_with_encoder(encoder)?
        }
        _ => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?,
    }
    Ok(buffer)
}

fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn list_images(dir: &Path, bucket: Bucket) -> Result<Vec<StoredImage>> {
    let mut images = vec![];
    for entry in fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let filename = entry.file_name().to_string_lossy().into_owned();
        if !is_image_name(&filename) {
            continue;
        }
        let meta = entry.metadata().map_err(|e| StoreError::io(entry.path(), e))?;
        if !meta.is_file() {
            continue;
        }
        let modified = DateTime::<Utc>::from(meta.modified().unwrap_or(UNIX_EPOCH));
        images.push(StoredImage {
            path: bucket.public_path(&filename),
            filename,
            size: meta.len(),
            modified,
        });
    }
    images.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(images)
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    use super::*;

    fn open_store(root: &Path) -> ImageStore {
        ImageStore::open(&PublicDir::new(root), &StoreOptions::default()).unwrap()
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a.png").unwrap(), "a.png");
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\b.jpg").unwrap(), "b.jpg");
        assert!(sanitize_file_name("").is_err());
        assert!(sanitize_file_name("..").is_err());
        assert!(sanitize_file_name("foo/").is_err());
    }

    #[test]
    fn test_is_image_name() {
        assert!(is_image_name("a.JPG"));
        assert!(is_image_name("b.bmp"));
        assert!(!is_image_name("c.txt"));
        assert!(!is_image_name("jpg"));
    }

    #[test]
    fn test_persist_overwrites_existing() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        store.persist(&b"first version"[..], "a.png").unwrap();
        let saved = store.persist(&b"second"[..], "a.png").unwrap();

        assert_eq!(saved.size, 6);
        assert_eq!(fs::read(&saved.path).unwrap(), b"second");
    }

    #[test]
    fn test_persist_strips_directories() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let saved = store.persist(&b"xx"[..], "../escape.png").unwrap();
        assert_eq!(saved.path, store.upload_dir().join("escape.png"));
        assert!(!dir.path().join("escape.png").exists());
    }

    #[test]
    fn test_persist_unique_names() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let a = store.persist_unique(Bucket::Upload, &b"1"[..], "image", "Photo.PNG").unwrap();
        let b = store.persist_unique(Bucket::Result, &b"2"[..], "result", "x.jpg").unwrap();

        assert!(a.file_name().starts_with("image-"));
        assert!(a.file_name().ends_with(".png"));
        assert_eq!(a.path.parent().unwrap(), store.upload_dir());
        assert!(b.file_name().starts_with("result-"));
        assert_eq!(b.path.parent().unwrap(), store.result_dir());
    }

    #[test]
    fn test_write_result_rgba() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 128])));
        let saved = store.write_result(&img).unwrap();

        let decoded = image::open(&saved.path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
        assert_eq!(fs::metadata(&saved.path).unwrap().len(), saved.size);
    }

    #[test]
    fn test_write_result_empty_image() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let img = DynamicImage::new_rgb8(0, 3);
        assert!(matches!(store.write_result(&img), Err(StoreError::EmptyImage { .. })));
        assert_eq!(fs::read_dir(store.result_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        store.persist(&b"b"[..], "b.png").unwrap();
        store.persist(&b"aa"[..], "a.jpg").unwrap();
        store.persist(&b"note"[..], "notes.txt").unwrap();

        let images = store.list_uploads().unwrap();
        let names: Vec<_> = images.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.png"]);
        assert_eq!(images[0].path, "/images_input/a.jpg");
        assert_eq!(images[0].size, 2);

        store.delete_upload("a.jpg").unwrap();
        assert!(matches!(store.delete_upload("a.jpg"), Err(StoreError::NotFound(_))));
        assert_eq!(store.list_uploads().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_rejects_paths() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        store.persist(&b"aa"[..], "a.jpg").unwrap();
        fs::write(dir.path().join("keep.jpg"), b"outside").unwrap();

        for name in ["x/a.jpg", "x\\a.jpg", "../keep.jpg", "..", ""] {
            assert!(
                matches!(store.delete_upload(name), Err(StoreError::InvalidFileName(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(store.upload_dir().join("a.jpg").exists());
        assert!(dir.path().join("keep.jpg").exists());
    }

    #[test]
    fn test_list_modified_time() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let before = Utc::now() - chrono::Duration::seconds(5);

        store.persist(&b"aa"[..], "a.jpg").unwrap();

        let images = store.list_uploads().unwrap();
        assert!(images[0].modified >= before);
        let json = serde_json::to_value(&images[0]).unwrap();
        let modified = json["modified"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(modified).is_ok());
    }
}
