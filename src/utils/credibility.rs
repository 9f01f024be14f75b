//! 来源可信度评估 - 基于域名声誉与内容特征的启发式评分

/// 高可信度域名及其基准分
const HIGH_CREDIBILITY_DOMAINS: &[(&str, f64)] = &[
    (".gov", 0.95),
    (".edu", 0.90),
    ("who.int", 0.95),
    ("cdc.gov", 0.95),
    ("nih.gov", 0.95),
    ("nature.com", 0.90),
    ("science.org", 0.90),
    ("sciencedirect.com", 0.85),
    ("reuters.com", 0.85),
    ("apnews.com", 0.85),
    ("bbc.com", 0.80),
    ("theguardian.com", 0.80),
    ("nytimes.com", 0.80),
    ("washingtonpost.com", 0.80),
    ("npr.org", 0.80),
];

/// 低可信度域名
const LOW_CREDIBILITY_DOMAINS: &[(&str, f64)] = &[
    ("facebook.com", 0.30),
    ("twitter.com", 0.35),
    ("reddit.com", 0.40),
    ("medium.com", 0.50),
    ("wordpress.com", 0.45),
    ("blogspot.com", 0.40),
    ("tumblr.com", 0.35),
];

/// 从URL中提取域名部分（小写）
fn extract_domain(url: &str) -> Option<String> {
    let rest = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))
        .unwrap_or(url.trim());
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.split('@').next_back()?;
    let host = host.split(':').next()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_lowercase())
}

/// 计算单个来源的可信度评分，0.0-1.0
///
/// 评分因素：域名声誉优先，其次为机构/媒体/博客等关键词启发
pub fn score_source(url: &str) -> f64 {
    let Some(domain) = extract_domain(url) else {
        // URL无法解析时的缺省分
        return 0.50;
    };

    for (pattern, score) in HIGH_CREDIBILITY_DOMAINS {
        if domain.contains(pattern) {
            return *score;
        }
    }
    for (pattern, score) in LOW_CREDIBILITY_DOMAINS {
        if domain.contains(pattern) {
            return *score;
        }
    }

    // 未知来源的启发式评分
    let mut base_score: f64 = 0.60;

    let org_keywords = ["university", "institute", "foundation", "organization", "association"];
    if org_keywords.iter().any(|k| domain.contains(k)) {
        base_score += 0.15;
    }

    let news_keywords = ["news", "times", "post", "journal", "telegraph", "herald"];
    if news_keywords.iter().any(|k| domain.contains(k)) {
        base_score += 0.10;
    }

    let blog_keywords = ["blog", "personal", "diary"];
    if blog_keywords.iter().any(|k| domain.contains(k)) {
        base_score -= 0.10;
    }

    if ["shop", "store", "buy", "sale"].iter().any(|k| domain.contains(k)) {
        base_score -= 0.05;
    }

    base_score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_credibility_domains() {
        assert_eq!(score_source("https://www.cdc.gov/flu/index.html"), 0.95);
        assert_eq!(score_source("https://www.nature.com/articles/abc"), 0.90);
        assert_eq!(score_source("https://apnews.com/article/x"), 0.85);
    }

    #[test]
    fn test_low_credibility_domains() {
        assert_eq!(score_source("https://www.facebook.com/post/1"), 0.30);
        assert_eq!(score_source("http://someone.blogspot.com/2024"), 0.40);
    }

    #[test]
    fn test_heuristic_scoring() {
        // 机构关键词加分
        assert!(score_source("https://cancer-institute.org/report") > 0.60);
        // 博客关键词减分
        assert!(score_source("https://myblog.example.com") < 0.60);
        // 未知域名使用缺省基准
        assert_eq!(score_source("https://example.com/page"), 0.60);
    }

    #[test]
    fn test_malformed_url() {
        assert_eq!(score_source(""), 0.50);
        assert_eq!(score_source("https://"), 0.50);
    }

    #[test]
    fn test_score_bounds() {
        let score = score_source("https://news-times-post-journal.com");
        assert!((0.0..=1.0).contains(&score));
    }
}
