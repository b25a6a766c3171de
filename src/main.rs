use bookprobe::extract::text::truncate_chars;
use bookprobe::{
    BookResponse, BookViewData, ExtractionConfig, ExtractionRequest, Preview, PreviewResponse, Result,
    extract_book, extract_preview, markup_to_text,
};
use clap::Parser;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// 📚 BookProbe - 电子书内容提取工具
#[derive(Parser)]
#[command(name = "bookprobe")]
#[command(about = "识别电子书格式并提取可渲染的内容")]
#[command(version)]
struct Args {
    /// 书籍文件路径
    #[arg(required_unless_present = "generate_config", help = "要提取的书籍文件路径")]
    file: Option<String>,

    /// 声明的格式
    #[arg(short, long, help = "声明的格式或扩展名（缺省时由文件扩展名推断）")]
    format: Option<String>,

    /// 结构化阅读模式
    #[arg(short, long, help = "只进行结构化提取（EPUB/AZW3/MOBI）")]
    book: bool,

    /// 输出JSON响应
    #[arg(short, long, help = "以JSON格式输出响应")]
    json: bool,

    /// 配置文件
    #[arg(short, long, help = "YAML配置文件路径")]
    config: Option<String>,

    /// 生成默认配置文件
    #[arg(long, help = "把默认配置写入指定路径后退出")]
    generate_config: Option<String>,

    /// 详细输出模式
    #[arg(short, long, help = "输出调试日志")]
    verbose: bool,

    /// 显示章节内容
    #[arg(short, long, value_enum, help = "显示提取到的内容")]
    show: Option<ContentFormat>,

    /// 内容最大显示长度
    #[arg(long, default_value = "2000", help = "内容最大显示字符数（0表示不限制）")]
    max_length: usize,
}

/// 内容显示格式
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ContentFormat {
    /// 净化后的HTML
    Html,
    /// 纯文本（移除所有HTML标签）
    Text,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// 执行命令，返回提取是否成功
async fn run(args: Args) -> Result<bool> {
    if let Some(path) = &args.generate_config {
        ExtractionConfig::generate_default_config(path)?;
        println!("✅ 默认配置已写入: {}", path);
        return Ok(true);
    }

    let config = match &args.config {
        Some(path) => ExtractionConfig::from_file(path)?,
        None => ExtractionConfig::default(),
    };

    let Some(file) = args.file.clone() else {
        return Ok(false);
    };
    let mut request = ExtractionRequest::from_path(file);
    if let Some(format) = &args.format {
        request = request.with_format(format.clone());
    }

    if args.book {
        let response = extract_book(&request, &config).await;
        if args.json {
            print_json(&response);
        } else {
            display_book_response(&response, &args);
        }
        Ok(response.success)
    } else {
        let response = extract_preview(&request, &config).await;
        if args.json {
            print_json(&response);
        } else {
            display_preview_response(&response, &args);
        }
        Ok(response.success)
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("❌ 无法序列化响应: {}", e),
    }
}

fn display_preview_response(response: &PreviewResponse, args: &Args) {
    let Some(preview) = &response.preview else {
        eprintln!("❌ 提取失败: {}", response.error.as_deref().unwrap_or_default());
        return;
    };

    println!("📚 提取结果: {}", preview.kind());
    match preview {
        Preview::DataUrl { mime, data } => {
            println!("  📦 原样透传: {} ({} 字节base64)", mime, data.len());
        }
        Preview::Text { content } => {
            println!("  📝 纯文本: {} 个字符", content.chars().count());
            if args.show.is_some() {
                println!("\n{}", limit(content, args.max_length));
            }
        }
        Preview::Html { content } => {
            println!("  📄 HTML文档: {} 个字符", content.chars().count());
            show_markup(content, args);
        }
        Preview::Foliate { mime, book, .. } => {
            println!("  📦 {}", mime);
            display_book(book, args);
        }
    }
}

fn display_book_response(response: &BookResponse, args: &Args) {
    match &response.book {
        Some(book) => display_book(book, args),
        None => eprintln!("❌ 提取失败: {}", response.error.as_deref().unwrap_or_default()),
    }
}

fn display_book(book: &BookViewData, args: &Args) {
    println!("\n📊 元数据:");
    println!("    标题: {}", book.metadata.title);
    println!("    作者: {}", book.metadata.creator);
    println!("    语言: {}", book.metadata.language);

    println!("\n📖 章节 ({}):", book.spine.len());
    for (i, entry) in book.spine.iter().enumerate() {
        let label = if entry.label.is_empty() {
            String::new()
        } else {
            format!(" [{}]", entry.label)
        };
        println!(
            "  {}. {} ({}){} - {} 个字符",
            i + 1,
            entry.id,
            entry.href,
            label,
            entry.content.chars().count()
        );
    }
    println!("\n🎨 样式表: {}", book.styles.len());

    for entry in &book.spine {
        if args.show.is_some() {
            println!("\n──── {} ────", entry.href);
        }
        show_markup(&entry.content, args);
    }
}

fn show_markup(content: &str, args: &Args) {
    match args.show {
        Some(ContentFormat::Html) => println!("{}", limit(content, args.max_length)),
        Some(ContentFormat::Text) => println!("{}", limit(&markup_to_text(content), args.max_length)),
        None => {}
    }
}

fn limit(content: &str, max_length: usize) -> String {
    if max_length == 0 {
        content.to_string()
    } else {
        truncate_chars(content, max_length)
    }
}
