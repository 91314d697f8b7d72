//! Pagekit Derive Macros: Component Boilerplate
//!
//! `#[derive(Component)]` writes the three required methods of
//! `pagekit::Component` for a struct that holds a `pagekit::Context`:
//!
//! - `from_context()` stores the context; every other field is
//!   `Default::default()`
//! - `context()` returns it
//! - `declare()` calls an associated function returning the type's
//!   `DeclarationBuilder` (`Self::declare_fields` unless overridden), then
//!   applies any type defaults given as attributes
//!
//! # Attributes
//!
//! Container:
//!
//! - `#[pagekit(declare = path::to_fn)]` - Declaration function
//! - `#[pagekit(default_by = "link_text")]` - Default location strategy
//! - `#[pagekit(timeout_ms = 500)]` - Default lookup timeout
//! - `#[pagekit(page)]` - Also implement `pagekit::Page`
//! - `#[pagekit(url = "/users/:id")]` - Page with a URL pattern (implies `page`)
//!
//! Field:
//!
//! - `#[pagekit(context)]` - The context field, when its type is not
//!   spelled `Context`
//!
//! # Example
//!
//! ```ignore
//! use pagekit::{Component, Context, Declaration, DeclarationBuilder, ElementDescriptor};
//!
//! #[derive(Component)]
//! #[pagekit(url = "/login")]
//! struct LoginPage {
//!     context: Context,
//! }
//!
//! impl LoginPage {
//!     fn declare_fields() -> DeclarationBuilder {
//!         Declaration::of::<Self>()
//!             .field("username", ElementDescriptor::new("#user").value())
//!             .field("submit", ElementDescriptor::new("button[type=submit]"))
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Index, LitInt, LitStr, Path};

/// Derive `pagekit::Component` (and optionally `pagekit::Page`).
#[proc_macro_derive(Component, attributes(pagekit))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_component(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// ============================================================================
// Expansion
// ============================================================================

#[derive(Default)]
struct ContainerOptions {
    declare: Option<Path>,
    default_by: Option<syn::Ident>,
    timeout_ms: Option<u64>,
    page: bool,
    url: Option<String>,
}

fn expand_component(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let options = parse_container(&input.attrs)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "Component can only be derived for structs",
        ));
    };
    let context_index = find_context_field(&data.fields, name)?;

    let (constructor, accessor) = match &data.fields {
        Fields::Named(fields) => {
            let inits = fields.named.iter().enumerate().map(|(i, f)| {
                let ident = &f.ident;
                if i == context_index {
                    quote! { #ident: context }
                } else {
                    quote! { #ident: ::core::default::Default::default() }
                }
            });
            let ident = &fields.named[context_index].ident;
            (quote! { Self { #(#inits),* } }, quote! { &self.#ident })
        }
        Fields::Unnamed(fields) => {
            let inits = (0..fields.unnamed.len()).map(|i| {
                if i == context_index {
                    quote! { context }
                } else {
                    quote! { ::core::default::Default::default() }
                }
            });
            let index = Index::from(context_index);
            (quote! { Self(#(#inits),*) }, quote! { &self.#index })
        }
        Fields::Unit => return Err(missing_context(name)),
    };

    let declare = options
        .declare
        .as_ref()
        .map_or_else(|| quote! { Self::declare_fields }, |path| quote! { #path });
    let default_by = options
        .default_by
        .as_ref()
        .map(|by| quote! { .default_by(::pagekit::By::#by) });
    let timeout = options
        .timeout_ms
        .map(|ms| quote! { .default_timeout(::std::time::Duration::from_millis(#ms)) });

    let page_impl = if options.page || options.url.is_some() {
        let url = options.url.as_ref().map(|url| {
            quote! {
                fn url_pattern() -> ::core::option::Option<&'static str> {
                    ::core::option::Option::Some(#url)
                }
            }
        });
        quote! {
            impl #impl_generics ::pagekit::Page for #name #ty_generics #where_clause {
                #url
            }
        }
    } else {
        TokenStream2::new()
    };

    Ok(quote! {
        impl #impl_generics ::pagekit::Component for #name #ty_generics #where_clause {
            fn declare() -> ::pagekit::DeclarationBuilder {
                #declare() #default_by #timeout
            }

            fn from_context(context: ::pagekit::Context) -> Self {
                #constructor
            }

            fn context(&self) -> &::pagekit::Context {
                #accessor
            }
        }

        #page_impl
    })
}

fn missing_context(name: &syn::Ident) -> syn::Error {
    syn::Error::new_spanned(name, "Component needs a field holding a pagekit::Context")
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse `#[pagekit(...)]` on the struct
fn parse_container(attrs: &[Attribute]) -> syn::Result<ContainerOptions> {
    let mut options = ContainerOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("pagekit")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("declare") {
                options.declare = Some(meta.value()?.parse::<Path>()?);
            } else if meta.path.is_ident("default_by") {
                let lit: LitStr = meta.value()?.parse()?;
                let variant = strategy_variant(&lit.value())
                    .ok_or_else(|| meta.error(format!("unknown location strategy '{}'", lit.value())))?;
                options.default_by = Some(syn::Ident::new(variant, Span::call_site()));
            } else if meta.path.is_ident("timeout_ms") {
                let lit: LitInt = meta.value()?.parse()?;
                options.timeout_ms = Some(lit.base10_parse()?);
            } else if meta.path.is_ident("page") {
                options.page = true;
            } else if meta.path.is_ident("url") {
                let lit: LitStr = meta.value()?.parse()?;
                options.url = Some(lit.value());
            } else {
                return Err(meta.error("unsupported pagekit attribute"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

/// `By` variant for a strategy name
fn strategy_variant(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
        "css" | "css_selector" => Some("Css"),
        "xpath" => Some("XPath"),
        "link_text" => Some("LinkText"),
        "partial_link_text" => Some("PartialLinkText"),
        "tag" | "tag_name" => Some("TagName"),
        "id" => Some("Id"),
        "name" => Some("Name"),
        "class" | "class_name" => Some("ClassName"),
        _ => None,
    }
}

fn has_context_marker(attrs: &[Attribute]) -> bool {
    attrs.iter().filter(|a| a.path().is_ident("pagekit")).any(|attr| {
        let mut marked = false;
        let _ = attr.parse_nested_meta(|meta| {
            marked |= meta.path.is_ident("context");
            Ok(())
        });
        marked
    })
}

fn is_context_type(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Context"),
        _ => false,
    }
}

/// Index of the field holding the context: the marked one, else the only
/// one typed `Context`
fn find_context_field(fields: &Fields, name: &syn::Ident) -> syn::Result<usize> {
    let fields: Vec<&syn::Field> = fields.iter().collect();
    if let Some(index) = fields.iter().position(|f| has_context_marker(&f.attrs)) {
        return Ok(index);
    }
    let typed: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| is_context_type(&f.ty))
        .map(|(i, _)| i)
        .collect();
    match typed.as_slice() {
        [index] => Ok(*index),
        [] => Err(missing_context(name)),
        _ => Err(syn::Error::new_spanned(
            name,
            "several Context fields; mark one with #[pagekit(context)]",
        )),
    }
}
