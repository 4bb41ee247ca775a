use aws_sdk_cloudfront::error::BuildError;
use aws_sdk_cloudfront::types::{
    Aliases, AllowedMethods, CachedMethods, CookiePreference, DefaultCacheBehavior,
    DistributionConfig, ForwardedValues, ItemSelection, Method, MinimumProtocolVersion, Origin,
    Origins, S3OriginConfig, SslSupportMethod, ViewerCertificate, ViewerProtocolPolicy,
};
use clap::Parser;

use ops_edge_deploy::plan::{
    normalize_plan, plan_fingerprint, DistributionPlan, DEFAULT_ROOT_OBJECT, MINIMUM_TLS_VERSION,
};

#[derive(Parser)]
#[command(
    name = "edge-deploy",
    about = "Provision a CloudFront distribution in front of an S3 website bucket"
)]
struct Cli {
    /// S3 bucket holding the site content
    #[arg(long)]
    bucket: String,
    /// Public domain name served by the distribution
    #[arg(long)]
    domain: String,
    /// ACM certificate ARN (must be validated in us-east-1)
    #[arg(long)]
    certificate_arn: String,
}

fn distribution_config(plan: &DistributionPlan) -> Result<DistributionConfig, BuildError> {
    let origin = Origin::builder()
        .id(&plan.bucket)
        .domain_name(plan.origin_domain())
        .s3_origin_config(
            S3OriginConfig::builder()
                .origin_access_identity("")
                .build()?,
        )
        .build()?;

    let cache_behavior = DefaultCacheBehavior::builder()
        .target_origin_id(&plan.bucket)
        .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
        .allowed_methods(
            AllowedMethods::builder()
                .quantity(2)
                .items(Method::Get)
                .items(Method::Head)
                .cached_methods(
                    CachedMethods::builder()
                        .quantity(2)
                        .items(Method::Get)
                        .items(Method::Head)
                        .build()?,
                )
                .build()?,
        )
        .forwarded_values(
            ForwardedValues::builder()
                .query_string(false)
                .cookies(
                    CookiePreference::builder()
                        .forward(ItemSelection::None)
                        .build()?,
                )
                .build()?,
        )
        .min_ttl(0)
        .build()?;

    let viewer_certificate = ViewerCertificate::builder()
        .acm_certificate_arn(&plan.certificate_arn)
        .ssl_support_method(SslSupportMethod::SniOnly)
        .minimum_protocol_version(MinimumProtocolVersion::from(MINIMUM_TLS_VERSION))
        .build();

    DistributionConfig::builder()
        .caller_reference(plan_fingerprint(plan))
        .comment(plan.comment())
        .enabled(true)
        .origins(Origins::builder().quantity(1).items(origin).build()?)
        .default_cache_behavior(cache_behavior)
        .viewer_certificate(viewer_certificate)
        .aliases(Aliases::builder().quantity(1).items(&plan.domain).build()?)
        .default_root_object(DEFAULT_ROOT_OBJECT)
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let plan = normalize_plan(DistributionPlan {
        bucket: cli.bucket,
        domain: cli.domain,
        certificate_arn: cli.certificate_arn,
    })?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let cloudfront_client = aws_sdk_cloudfront::Client::new(&aws_config);

    eprintln!("Creating distribution for {}...", plan.domain);
    let response = cloudfront_client
        .create_distribution()
        .distribution_config(distribution_config(&plan)?)
        .send()
        .await?;

    let distribution = response
        .distribution()
        .ok_or("create_distribution returned no distribution")?;
    println!("Distribution id: {}", distribution.id());
    println!("Distribution domain: {}", distribution.domain_name());

    Ok(())
}
